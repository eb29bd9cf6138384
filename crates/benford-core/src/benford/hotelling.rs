//! Hotelling-type Q statistic on digit-conditioned significand transforms.
//!
//! For digit `d` the transform `z_d(x)` equals the significand `s(x)` when
//! `s(x)` lies in `[d, d + 1)` and zero otherwise. Under the Benford null
//! every `z_d` has mean `C = log10(e)` and the vector `z` has the fixed
//! covariance held by [`BenfordModel`]. The statistic is
//! `Q = n (zbar - C)^T Sigma^-1 (zbar - C)`.

use serde::{Deserialize, Serialize};

use crate::benford::digits::digit_of_significand;
use crate::benford::model::{quadratic_form, BenfordModel, Matrix9};
use crate::error::BenfordError;
use crate::types::DigitVector;
use crate::BenfordResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotellingResult {
    pub q_statistic: f64,
    /// Sample means of the digit-conditioned transforms.
    pub transform_means: DigitVector,
    pub sample_size: usize,
}

/// Running per-digit sums of the significand transform.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransformSums {
    sums: DigitVector,
    n: usize,
}

impl TransformSums {
    pub(crate) fn push(&mut self, significand: f64) {
        let d = digit_of_significand(significand);
        self.sums[(d - 1) as usize] += significand;
        self.n += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.n
    }

    pub(crate) fn means(&self) -> DigitVector {
        let n = self.n as f64;
        std::array::from_fn(|i| self.sums[i] / n)
    }

    /// Q statistic against the shared model constants.
    pub(crate) fn q_statistic(&self, c: f64, sigma_inv: &Matrix9) -> f64 {
        let means = self.means();
        let diff: DigitVector = std::array::from_fn(|i| means[i] - c);
        self.n as f64 * quadratic_form(sigma_inv, &diff)
    }
}

/// Means of `z_d` over a sequence of significands.
pub fn transform_means(significands: &[f64]) -> DigitVector {
    let mut sums = TransformSums::default();
    significands.iter().for_each(|&s| sums.push(s));
    sums.means()
}

/// Compute Q for a sequence of significands in `[1, 10)`.
///
/// Fails with `NumericalInstability` when the covariance matrix could not be
/// inverted and with `InsufficientData` on an empty sequence.
pub fn hotelling_statistic(significands: &[f64]) -> BenfordResult<HotellingResult> {
    if significands.is_empty() {
        return Err(BenfordError::InsufficientData(
            "Hotelling statistic needs at least one significand.".into(),
        ));
    }
    let model = BenfordModel::shared();
    let sigma_inv = model.covariance_inverse()?;

    let mut sums = TransformSums::default();
    significands.iter().for_each(|&s| sums.push(s));

    Ok(HotellingResult {
        q_statistic: sums.q_statistic(model.c(), sigma_inv),
        transform_means: sums.means(),
        sample_size: sums.len(),
    })
}
