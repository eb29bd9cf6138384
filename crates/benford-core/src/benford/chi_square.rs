//! Pearson chi-squared goodness-of-fit against the first-digit law.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::benford::digits::DigitDistribution;
use crate::benford::model::BenfordModel;
use crate::error::BenfordError;
use crate::types::{DigitVector, NUM_DIGITS};
use crate::BenfordResult;

/// Lower bound applied to every reported p-value so that logarithms stay
/// finite when p-values are combined.
pub const P_VALUE_FLOOR: f64 = 1e-10;

/// Degrees of freedom of the first-digit test.
pub const CHI_SQUARE_DF: u32 = (NUM_DIGITS - 1) as u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub degrees_of_freedom: u32,
    pub p_value: f64,
    pub expected_counts: DigitVector,
}

/// Clamp a p-value into `[P_VALUE_FLOOR, 1]`.
pub fn clamp_p_value(p: f64) -> f64 {
    if p.is_nan() {
        return P_VALUE_FLOOR;
    }
    p.clamp(P_VALUE_FLOOR, 1.0)
}

/// Upper tail `1 - CDF(x)` of a chi-squared distribution, clamped.
pub fn chi_squared_upper_tail(x: f64, df: u32) -> BenfordResult<f64> {
    let dist = ChiSquared::new(df as f64).map_err(|e| BenfordError::InvalidInput {
        field: "degrees_of_freedom".into(),
        reason: format!("Invalid ChiSquared parameters: {e}"),
    })?;
    Ok(clamp_p_value(dist.sf(x.max(0.0))))
}

/// Pearson statistic `sum (O - E)^2 / E`.
pub fn pearson_statistic(observed: &DigitVector, expected: &DigitVector) -> BenfordResult<f64> {
    let mut chi_sq = 0.0;
    for (d, (&o, &e)) in observed.iter().zip(expected.iter()).enumerate() {
        if !e.is_finite() || e <= 0.0 {
            return Err(BenfordError::DegenerateModel(format!(
                "Expected count for digit {} is {e}; all expected counts must be positive.",
                d + 1
            )));
        }
        let diff = o - e;
        chi_sq += diff * diff / e;
    }
    Ok(chi_sq)
}

/// Run the chi-squared test on observed counts, with expected counts
/// `n * p(d)` for `n` the number of counted values.
pub fn chi_square_test(distribution: &DigitDistribution) -> BenfordResult<ChiSquareResult> {
    let n = distribution.total();
    if n == 0 {
        return Err(BenfordError::InsufficientData(
            "Observed digit counts sum to zero.".into(),
        ));
    }
    let expected = BenfordModel::shared().expected_counts(n as usize);
    let statistic = pearson_statistic(&distribution.observed(), &expected)?;
    Ok(ChiSquareResult {
        statistic,
        degrees_of_freedom: CHI_SQUARE_DF,
        p_value: chi_squared_upper_tail(statistic, CHI_SQUARE_DF)?,
        expected_counts: expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_hand_counted_sample() {
        let dist = DigitDistribution::from_counts([3, 1, 1, 1, 1, 1, 1, 1, 1]);
        let r = chi_square_test(&dist).unwrap();
        let probs = BenfordModel::shared().probabilities();
        let want: f64 = dist
            .observed()
            .iter()
            .zip(probs.iter())
            .map(|(o, p)| (o - 11.0 * p).powi(2) / (11.0 * p))
            .sum();
        assert!(approx_eq(r.statistic, want, 1e-12));
        assert_eq!(r.degrees_of_freedom, 8);
        let total: f64 = r.expected_counts.iter().sum();
        assert!(approx_eq(total, 11.0, 1e-9));
    }

    #[test]
    fn test_total_concentration_on_digit_one() {
        let n = 250u64;
        let mut counts = [0u64; NUM_DIGITS];
        counts[0] = n;
        let r = chi_square_test(&DigitDistribution::from_counts(counts)).unwrap();
        let p1 = BenfordModel::shared().probability(1).unwrap();
        let want = n as f64 * (1.0 - p1) / p1;
        assert!(approx_eq(r.statistic, want, 1e-9));
        assert_eq!(r.p_value, P_VALUE_FLOOR);
    }

    #[test]
    fn test_perfect_fit_p_value_one() {
        let expected = BenfordModel::shared().expected_counts(1000);
        let stat = pearson_statistic(&expected, &expected).unwrap();
        assert!(approx_eq(stat, 0.0, 1e-20));
        assert!(approx_eq(chi_squared_upper_tail(stat, 8).unwrap(), 1.0, 1e-12));
    }

    #[test]
    fn test_critical_value_tail() {
        // 15.507 is the 5% critical value at df = 8.
        let p = chi_squared_upper_tail(15.507, 8).unwrap();
        assert!(approx_eq(p, 0.05, 1e-4), "p={p}");
        // 9.488 is the 5% critical value at df = 4.
        let p4 = chi_squared_upper_tail(9.488, 4).unwrap();
        assert!(approx_eq(p4, 0.05, 1e-4), "p={p4}");
    }

    #[test]
    fn test_p_value_bounds() {
        for stat in [0.0, 0.5, 8.0, 30.0, 500.0, 1e6] {
            let p = chi_squared_upper_tail(stat, 8).unwrap();
            assert!((P_VALUE_FLOOR..=1.0).contains(&p), "stat={stat} p={p}");
        }
    }

    #[test]
    fn test_zero_expected_is_degenerate() {
        let mut e = [1.0; NUM_DIGITS];
        e[3] = 0.0;
        assert!(matches!(
            pearson_statistic(&[1.0; NUM_DIGITS], &e),
            Err(BenfordError::DegenerateModel(_))
        ));
    }

    #[test]
    fn test_empty_distribution() {
        assert!(matches!(
            chi_square_test(&DigitDistribution::from_counts([0; NUM_DIGITS])),
            Err(BenfordError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_p_value(0.0), P_VALUE_FLOOR);
        assert_eq!(clamp_p_value(1.5), 1.0);
        assert_eq!(clamp_p_value(f64::NAN), P_VALUE_FLOOR);
        assert_eq!(clamp_p_value(0.3), 0.3);
    }
}
