//! Leading-digit and significand extraction.
//!
//! Values are reduced to their magnitude; zero, NaN and infinite magnitudes
//! are excluded and counted separately. The significand is obtained by
//! rescaling with an exact power of ten rather than by exponentiating the
//! fractional part of `log10`, then snapped to the nearest integer when it is
//! within a relative `1e-10` of it. A snapped significand of 10 wraps to 1, so
//! exact powers of ten always fall on digit 1.

use serde::{Deserialize, Serialize};

use crate::error::BenfordError;
use crate::types::{DigitVector, NUM_DIGITS};
use crate::BenfordResult;

/// Relative distance to an integer within which a significand is snapped.
pub const SIGNIFICAND_SNAP_TOLERANCE: f64 = 1e-10;

/// Observed leading-digit counts for a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitDistribution {
    /// Counts indexed by `digit - 1`.
    pub counts: [u64; NUM_DIGITS],
    /// Values dropped because their magnitude was zero, NaN or infinite.
    pub excluded: usize,
}

impl DigitDistribution {
    /// Builds a distribution directly from counts.
    pub fn from_counts(counts: [u64; NUM_DIGITS]) -> Self {
        Self {
            counts,
            excluded: 0,
        }
    }

    /// Number of values that contributed a digit.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Count for leading digit `digit`, or `None` outside 1..=9.
    pub fn count(&self, digit: u32) -> Option<u64> {
        let i = digit.checked_sub(1)? as usize;
        self.counts.get(i).copied()
    }

    /// Counts as floating point, for the statistics routines.
    pub fn observed(&self) -> DigitVector {
        std::array::from_fn(|i| self.counts[i] as f64)
    }

    /// Observed proportions. All zero when nothing was counted.
    pub fn proportions(&self) -> DigitVector {
        let total = self.total();
        if total == 0 {
            return [0.0; NUM_DIGITS];
        }
        let total = total as f64;
        std::array::from_fn(|i| self.counts[i] as f64 / total)
    }
}

/// Digit counts together with the significand of every counted value, in
/// sample order.
#[derive(Debug, Clone)]
pub struct ExtractedDigits {
    pub distribution: DigitDistribution,
    pub significands: Vec<f64>,
}

impl ExtractedDigits {
    /// Number of counted values.
    pub fn len(&self) -> usize {
        self.significands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.significands.is_empty()
    }
}

/// Multiply `x` by `10^k` without overflowing the intermediate power.
fn scale_pow10(x: f64, k: i32) -> f64 {
    let mut value = x;
    let mut k = k;
    while k > 300 {
        value *= 1e300;
        k -= 300;
    }
    while k < -300 {
        value /= 1e300;
        k += 300;
    }
    if k >= 0 {
        value * 10f64.powi(k)
    } else {
        value / 10f64.powi(-k)
    }
}

/// Significand of `|x|` in `[1, 10)`, or `None` for zero, NaN and infinite
/// magnitudes.
pub fn significand(x: f64) -> Option<f64> {
    let x = x.abs();
    if x == 0.0 || !x.is_finite() {
        return None;
    }
    let exponent = x.log10().floor() as i32;
    let mut s = scale_pow10(x, -exponent);
    // log10 can land one ulp on the wrong side of an integer exponent.
    if s >= 10.0 {
        s /= 10.0;
    } else if s < 1.0 {
        s *= 10.0;
    }
    let nearest = s.round();
    if (s - nearest).abs() <= SIGNIFICAND_SNAP_TOLERANCE * nearest {
        s = nearest;
    }
    if s >= 10.0 {
        s = 1.0;
    }
    Some(s)
}

/// Leading significant digit of a significand in `[1, 10)`.
pub fn digit_of_significand(s: f64) -> u32 {
    (s.floor() as u32).clamp(1, 9)
}

/// Leading significant digit of `|x|`.
pub fn first_digit(x: f64) -> Option<u32> {
    significand(x).map(digit_of_significand)
}

/// Extract digit counts and significands from a sample.
///
/// Fails with `InsufficientData` when no value survives filtering.
pub fn extract_digits(sample: &[f64]) -> BenfordResult<ExtractedDigits> {
    if sample.is_empty() {
        return Err(BenfordError::InsufficientData(
            "At least one data point is required.".into(),
        ));
    }
    let mut counts = [0u64; NUM_DIGITS];
    let mut significands = Vec::with_capacity(sample.len());
    let mut excluded = 0usize;

    for &x in sample {
        match significand(x) {
            Some(s) => {
                counts[(digit_of_significand(s) - 1) as usize] += 1;
                significands.push(s);
            }
            None => excluded += 1,
        }
    }

    if significands.is_empty() {
        return Err(BenfordError::InsufficientData(format!(
            "No valid extractable digits: all {excluded} values are zero, NaN or infinite."
        )));
    }

    Ok(ExtractedDigits {
        distribution: DigitDistribution { counts, excluded },
        significands,
    })
}
