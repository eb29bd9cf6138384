//! Theoretical first-digit model: the Benford probability table, the
//! constant `C = log10(e)`, and the fixed 9x9 covariance matrix of the
//! digit-conditioned significand transform together with its inverse.
//!
//! The model depends only on digit indices, so it is built once per process
//! and shared read-only by every analysis and every Monte Carlo trial.

use std::f64::consts::LOG10_E;
use std::sync::OnceLock;

use crate::error::BenfordError;
use crate::types::{DigitVector, NUM_DIGITS};
use crate::BenfordResult;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A 9x9 matrix stored row-major.
pub type Matrix9 = [[f64; NUM_DIGITS]; NUM_DIGITS];

/// Pivots smaller than this are treated as singular.
const PIVOT_EPSILON: f64 = 1e-12;

static SHARED_MODEL: OnceLock<BenfordModel> = OnceLock::new();

/// Immutable Benford constants.
#[derive(Debug, Clone)]
pub struct BenfordModel {
    probabilities: DigitVector,
    covariance: Matrix9,
    covariance_inverse: Option<Matrix9>,
}

impl BenfordModel {
    /// Process-wide model instance.
    pub fn shared() -> &'static BenfordModel {
        SHARED_MODEL.get_or_init(BenfordModel::new)
    }

    fn new() -> Self {
        let probabilities = std::array::from_fn(|i| benford_probability(i as u32 + 1));
        let covariance = covariance_matrix();
        let covariance_inverse = mat_inverse(&covariance).ok();
        Self {
            probabilities,
            covariance,
            covariance_inverse,
        }
    }

    /// `C = log10(e)`, the null mean of every digit-conditioned transform.
    pub fn c(&self) -> f64 {
        LOG10_E
    }

    /// Theoretical probabilities indexed by `digit - 1`.
    pub fn probabilities(&self) -> &DigitVector {
        &self.probabilities
    }

    /// Probability of leading digit `d`, or `None` outside 1..=9.
    pub fn probability(&self, d: u32) -> Option<f64> {
        let i = d.checked_sub(1)? as usize;
        self.probabilities.get(i).copied()
    }

    /// Expected counts `n * p(d)`.
    pub fn expected_counts(&self, n: usize) -> DigitVector {
        let n = n as f64;
        std::array::from_fn(|i| n * self.probabilities[i])
    }

    pub fn covariance(&self) -> &Matrix9 {
        &self.covariance
    }

    /// Inverse of the covariance matrix, or `NumericalInstability` when the
    /// matrix failed to invert at construction.
    pub fn covariance_inverse(&self) -> BenfordResult<&Matrix9> {
        self.covariance_inverse.as_ref().ok_or_else(|| {
            BenfordError::NumericalInstability(
                "Benford covariance matrix is singular and cannot be inverted".into(),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// `p(d) = log10(1 + 1/d)`
fn benford_probability(d: u32) -> f64 {
    (1.0 + 1.0 / d as f64).log10()
}

/// Diagonal `C (d + 0.5 - C)`, off-diagonal `-C^2`.
fn covariance_matrix() -> Matrix9 {
    let c = LOG10_E;
    std::array::from_fn(|i| {
        std::array::from_fn(|j| {
            if i == j {
                let d = (i + 1) as f64;
                c * (d + 0.5 - c)
            } else {
                -c * c
            }
        })
    })
}

// ---------------------------------------------------------------------------
// Linear algebra helpers
// ---------------------------------------------------------------------------

/// Quadratic form `v^T M v`.
pub(crate) fn quadratic_form(m: &Matrix9, v: &DigitVector) -> f64 {
    m.iter()
        .zip(v.iter())
        .map(|(row, vi)| vi * row.iter().zip(v.iter()).map(|(a, b)| a * b).sum::<f64>())
        .sum()
}

/// Matrix inverse via Gauss-Jordan with partial pivoting.
#[allow(clippy::needless_range_loop)]
pub(crate) fn mat_inverse(mat: &Matrix9) -> BenfordResult<Matrix9> {
    let n = NUM_DIGITS;
    let mut aug: Vec<Vec<f64>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(2 * n);
        row.extend_from_slice(&mat[i]);
        for j in 0..n {
            row.push(if i == j { 1.0 } else { 0.0 });
        }
        aug.push(row);
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if !max_val.is_finite() || max_val < PIVOT_EPSILON {
            return Err(BenfordError::NumericalInstability(
                "Singular matrix cannot be inverted".into(),
            ));
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot = aug[col][col];
        for cell in aug[col].iter_mut() {
            *cell /= pivot;
        }

        let pivot_row = aug[col].clone();
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            for (cell, &pv) in aug[row].iter_mut().zip(pivot_row.iter()) {
                *cell -= factor * pv;
            }
        }
    }

    let mut inv = [[0.0; NUM_DIGITS]; NUM_DIGITS];
    for (dst, row) in inv.iter_mut().zip(aug.iter()) {
        dst.copy_from_slice(&row[n..]);
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let total: f64 = BenfordModel::shared().probabilities().iter().sum();
        assert!(approx_eq(total, 1.0, 1e-12));
    }

    #[test]
    fn test_p1_and_p9() {
        let m = BenfordModel::shared();
        assert!(approx_eq(m.probability(1).unwrap(), 0.30103, 1e-5));
        assert!(approx_eq(m.probability(9).unwrap(), 0.04576, 1e-5));
    }

    #[test]
    fn test_probability_outside_digit_range() {
        let m = BenfordModel::shared();
        assert_eq!(m.probability(0), None);
        assert_eq!(m.probability(10), None);
    }

    #[test]
    fn test_expected_counts_sum_to_n() {
        let m = BenfordModel::shared();
        for n in [1usize, 11, 997, 100_000] {
            let total: f64 = m.expected_counts(n).iter().sum();
            assert!(approx_eq(total, n as f64, 1e-9 * n as f64), "n={n}");
        }
    }

    #[test]
    fn test_covariance_entries() {
        let m = BenfordModel::shared();
        let c = m.c();
        let cov = m.covariance();
        assert!(approx_eq(cov[0][0], c * (1.5 - c), 1e-15));
        assert!(approx_eq(cov[8][8], c * (9.5 - c), 1e-15));
        assert!(approx_eq(cov[2][5], -c * c, 1e-15));
        for i in 0..NUM_DIGITS {
            for j in 0..NUM_DIGITS {
                assert_eq!(cov[i][j], cov[j][i]);
            }
        }
    }

    #[test]
    fn test_inverse_is_inverse() {
        let m = BenfordModel::shared();
        let cov = m.covariance();
        let inv = m.covariance_inverse().unwrap();
        for i in 0..NUM_DIGITS {
            for j in 0..NUM_DIGITS {
                let prod: f64 = (0..NUM_DIGITS).map(|k| cov[i][k] * inv[k][j]).sum();
                let target = if i == j { 1.0 } else { 0.0 };
                assert!(approx_eq(prod, target, 1e-8), "({i},{j}) = {prod}");
            }
        }
    }

    #[test]
    fn test_covariance_positive_definite() {
        // The inverse of a positive definite matrix yields positive forms.
        let inv = BenfordModel::shared().covariance_inverse().unwrap();
        let v: DigitVector = [0.3, -0.1, 0.2, 0.0, -0.4, 0.1, 0.05, -0.2, 0.3];
        assert!(quadratic_form(inv, &v) > 0.0);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let singular = [[1.0; NUM_DIGITS]; NUM_DIGITS];
        assert!(matches!(
            mat_inverse(&singular),
            Err(BenfordError::NumericalInstability(_))
        ));
    }

    #[test]
    fn test_shared_is_single_instance() {
        assert!(std::ptr::eq(BenfordModel::shared(), BenfordModel::shared()));
    }
}
