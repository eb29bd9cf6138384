//! Classical conformity scores between observed and expected digit counts.
//!
//! None of these decides a verdict; they are reported alongside the
//! hypothesis tests for diagnosis and for comparing samples with each other.

use serde::{Deserialize, Serialize};

use crate::benford::model::BenfordModel;
use crate::error::BenfordError;
use crate::types::{DigitVector, NUM_DIGITS};
use crate::BenfordResult;

/// Discrepancy scores for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyMetrics {
    /// Sum of absolute proportion differences.
    pub delta: f64,
    /// Normalised Euclidean distance.
    pub ned: f64,
    /// Mean absolute deviation from the theoretical Benford probabilities.
    pub mad: f64,
    /// Largest per-digit Wald z-score.
    pub z_stat: f64,
    /// Digit at which `z_stat` occurs.
    pub z_stat_digit: u32,
    /// Pearson correlation of the proportion vectors; `None` when either
    /// vector is constant.
    pub pearson: Option<f64>,
}

fn validate_counts(observed: &DigitVector, expected: &DigitVector) -> BenfordResult<(f64, f64)> {
    for (i, &o) in observed.iter().enumerate() {
        if !o.is_finite() || o < 0.0 {
            return Err(BenfordError::InvalidInput {
                field: "observed".into(),
                reason: format!("Count for digit {} must be finite and non-negative.", i + 1),
            });
        }
    }
    for (i, &e) in expected.iter().enumerate() {
        if !e.is_finite() || e <= 0.0 {
            return Err(BenfordError::DegenerateModel(format!(
                "Expected count for digit {} is {e}; all expected counts must be positive.",
                i + 1
            )));
        }
    }
    let obs_total: f64 = observed.iter().sum();
    if obs_total <= 0.0 {
        return Err(BenfordError::InsufficientData(
            "Observed digit counts sum to zero.".into(),
        ));
    }
    Ok((obs_total, expected.iter().sum()))
}

fn pearson_correlation(a: &DigitVector, b: &DigitVector) -> Option<f64> {
    let n = NUM_DIGITS as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= f64::EPSILON * f64::EPSILON || var_b <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Compute delta, NED, MAD, zStat and Pearson correlation.
///
/// `observed` and `expected` are raw counts indexed by `digit - 1`; each is
/// normalised by its own sum. MAD is measured against the theoretical
/// probabilities rather than `expected`.
pub fn compute_discrepancy_metrics(
    observed: &DigitVector,
    expected: &DigitVector,
) -> BenfordResult<DiscrepancyMetrics> {
    let (obs_total, exp_total) = validate_counts(observed, expected)?;
    let probs = BenfordModel::shared().probabilities();

    let obs_p: DigitVector = std::array::from_fn(|i| observed[i] / obs_total);
    let exp_p: DigitVector = std::array::from_fn(|i| expected[i] / exp_total);

    let mut delta = 0.0;
    let mut ned_sq = 0.0;
    let mut mad = 0.0;
    let mut z_stat = 0.0;
    let mut z_stat_digit = 1;

    for i in 0..NUM_DIGITS {
        let diff = obs_p[i] - exp_p[i];
        delta += diff.abs();
        ned_sq += diff * diff / exp_p[i];
        mad += (obs_p[i] - probs[i]).abs();

        let std_err = (exp_p[i] * (1.0 - exp_p[i]) / obs_total).sqrt();
        if std_err <= 0.0 {
            return Err(BenfordError::DegenerateModel(format!(
                "Expected proportion for digit {} leaves no variance.",
                i + 1
            )));
        }
        let z = diff.abs() / std_err;
        if z > z_stat {
            z_stat = z;
            z_stat_digit = i as u32 + 1;
        }
    }

    Ok(DiscrepancyMetrics {
        delta,
        ned: ned_sq.sqrt(),
        mad: mad / NUM_DIGITS as f64,
        z_stat,
        z_stat_digit,
        pearson: pearson_correlation(&obs_p, &exp_p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn benford_expected(n: usize) -> DigitVector {
        BenfordModel::shared().expected_counts(n)
    }

    #[test]
    fn test_identical_vectors_have_zero_distance() {
        let o = [40.0, 20.0, 10.0, 10.0, 5.0, 5.0, 4.0, 3.0, 3.0];
        let m = compute_discrepancy_metrics(&o, &o).unwrap();
        assert!(approx_eq(m.delta, 0.0, 1e-15));
        assert!(approx_eq(m.ned, 0.0, 1e-15));
        assert!(approx_eq(m.z_stat, 0.0, 1e-12));
        assert!(approx_eq(m.pearson.unwrap(), 1.0, 1e-12));
        // Self-comparison says nothing about Benford conformity.
        assert!(m.mad > 0.01);
    }

    #[test]
    fn test_mad_zero_only_for_benford_proportions() {
        let e = benford_expected(1000);
        let m = compute_discrepancy_metrics(&e, &e).unwrap();
        assert!(approx_eq(m.mad, 0.0, 1e-12));
        assert!(approx_eq(m.delta, 0.0, 1e-12));
    }

    #[test]
    fn test_uniform_against_benford() {
        let o = [50.0; NUM_DIGITS];
        let m = compute_discrepancy_metrics(&o, &benford_expected(450)).unwrap();
        assert!(m.delta > 0.0);
        assert!(m.ned > 0.0);
        assert!(m.mad > 0.0);
        assert_eq!(m.z_stat_digit, 1);
        // Constant observed proportions have no correlation.
        assert!(m.pearson.is_none());
    }

    #[test]
    fn test_concentrated_on_one_digit() {
        let mut o = [0.0; NUM_DIGITS];
        o[0] = 500.0;
        let m = compute_discrepancy_metrics(&o, &benford_expected(500)).unwrap();
        let p1 = BenfordModel::shared().probability(1).unwrap();
        assert!(approx_eq(m.delta, 2.0 * (1.0 - p1), 1e-12));
        let expected_z = (1.0 - p1) / (p1 * (1.0 - p1) / 500.0).sqrt();
        assert!(approx_eq(m.z_stat, expected_z, 1e-9));
        assert!(m.pearson.unwrap() > 0.0);
    }

    #[test]
    fn test_delta_hand_computed() {
        let o = [2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        let e = [1.0; NUM_DIGITS];
        let m = compute_discrepancy_metrics(&o, &e).unwrap();
        // |0.5 - 1/9| * 2 + 7 * (1/9)
        let want = 2.0 * (0.5 - 1.0 / 9.0) + 7.0 / 9.0;
        assert!(approx_eq(m.delta, want, 1e-12));
    }

    #[test]
    fn test_zero_observed_is_insufficient() {
        let r = compute_discrepancy_metrics(&[0.0; NUM_DIGITS], &benford_expected(10));
        assert!(matches!(r, Err(BenfordError::InsufficientData(_))));
    }

    #[test]
    fn test_zero_expected_is_degenerate() {
        let mut e = benford_expected(10);
        e[4] = 0.0;
        let r = compute_discrepancy_metrics(&[1.0; NUM_DIGITS], &e);
        assert!(matches!(r, Err(BenfordError::DegenerateModel(_))));
    }

    #[test]
    fn test_negative_observed_rejected() {
        let mut o = [1.0; NUM_DIGITS];
        o[2] = -1.0;
        let r = compute_discrepancy_metrics(&o, &benford_expected(10));
        assert!(matches!(r, Err(BenfordError::InvalidInput { .. })));
    }

    #[test]
    fn test_serde() {
        let o = [3.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let m = compute_discrepancy_metrics(&o, &benford_expected(11)).unwrap();
        let j = serde_json::to_string(&m).unwrap();
        let back: DiscrepancyMetrics = serde_json::from_str(&j).unwrap();
        assert_eq!(back.z_stat_digit, m.z_stat_digit);
    }
}
