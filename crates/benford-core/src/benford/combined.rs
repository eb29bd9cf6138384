//! Combined Benford test: Pearson chi-squared and Monte Carlo calibrated
//! Hotelling Q, merged with Fisher's method.

use serde::{Deserialize, Serialize};

use crate::benford::calibration::{calibrate, ProgressFn, DEFAULT_TRIALS};
use crate::benford::chi_square::{chi_square_test, chi_squared_upper_tail};
use crate::benford::digits::{extract_digits, ExtractedDigits};
use crate::benford::hotelling::hotelling_statistic;
use crate::benford::model::BenfordModel;
use crate::error::BenfordError;
use crate::types::{DigitVector, NUM_DIGITS};
use crate::BenfordResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Degrees of freedom of Fisher's statistic for two p-values.
pub const FISHER_DF: u32 = 4;

pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

fn default_trials() -> u32 {
    DEFAULT_TRIALS
}

fn default_significance_level() -> f64 {
    DEFAULT_SIGNIFICANCE_LEVEL
}

/// Configuration of one combined test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenfordTestConfig {
    /// Number of Monte Carlo trials.
    #[serde(default = "default_trials")]
    pub trials: u32,
    /// A sample conforms when the combined p-value exceeds this level.
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for BenfordTestConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            seed: None,
        }
    }
}

impl BenfordTestConfig {
    pub fn validate(&self) -> BenfordResult<()> {
        if self.trials == 0 {
            return Err(BenfordError::InvalidInput {
                field: "trials".into(),
                reason: "Must be at least 1".into(),
            });
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(BenfordError::InvalidInput {
                field: "significance_level".into(),
                reason: "Must be between 0 and 1 exclusive.".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Observed and expected mass for one leading digit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitCount {
    pub digit: u32,
    pub observed_count: u64,
    pub expected_count: f64,
    pub observed_pct: f64,
    pub expected_pct: f64,
}

/// Fisher combination of two independent p-values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FisherCombination {
    pub statistic: f64,
    pub p_value: f64,
}

/// Outcome of the combined Benford test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub chi2_stat: f64,
    pub chi2_p: f64,
    pub hotelling_q: f64,
    pub hotelling_p: f64,
    pub combined_stat: f64,
    pub combined_p: f64,
    /// True when `combined_p` exceeds the significance level.
    pub conforms: bool,
    pub significance_level: f64,
    pub sample_size: usize,
    pub excluded_values: usize,
    pub trials: u32,
    /// Effective Monte Carlo seed; replaying with it reproduces the result.
    pub seed: u64,
    pub digits: Vec<DigitCount>,
}

impl TestResult {
    /// Observed counts indexed by `digit - 1`.
    pub fn observed_counts(&self) -> [u64; NUM_DIGITS] {
        std::array::from_fn(|i| self.digits[i].observed_count)
    }

    /// Expected counts indexed by `digit - 1`.
    pub fn expected_counts(&self) -> DigitVector {
        std::array::from_fn(|i| self.digits[i].expected_count)
    }
}

// ---------------------------------------------------------------------------
// Fisher combination
// ---------------------------------------------------------------------------

fn check_p_value(field: &str, p: f64) -> BenfordResult<()> {
    if !(p > 0.0 && p <= 1.0) {
        return Err(BenfordError::InvalidInput {
            field: field.into(),
            reason: format!("p-value {p} must lie in (0, 1]"),
        });
    }
    Ok(())
}

/// Combine two independent p-values with Fisher's method:
/// `-2 (ln p1 + ln p2)` referred to a chi-squared distribution with 4
/// degrees of freedom.
pub fn fisher_combine(chi2_p: f64, hotelling_p: f64) -> BenfordResult<FisherCombination> {
    check_p_value("chi2_p", chi2_p)?;
    check_p_value("hotelling_p", hotelling_p)?;
    let statistic = -2.0 * (chi2_p.ln() + hotelling_p.ln());
    Ok(FisherCombination {
        statistic,
        p_value: chi_squared_upper_tail(statistic, FISHER_DF)?,
    })
}

// ---------------------------------------------------------------------------
// Combined test
// ---------------------------------------------------------------------------

pub(crate) fn digit_counts(extracted: &ExtractedDigits, expected: &DigitVector) -> Vec<DigitCount> {
    let probs = BenfordModel::shared().probabilities();
    let observed_p = extracted.distribution.proportions();
    (0..NUM_DIGITS)
        .map(|i| DigitCount {
            digit: i as u32 + 1,
            observed_count: extracted.distribution.counts[i],
            expected_count: expected[i],
            observed_pct: observed_p[i],
            expected_pct: probs[i],
        })
        .collect()
}

/// Run the combined test on an extracted sample.
pub(crate) fn run_on_extracted(
    extracted: &ExtractedDigits,
    config: &BenfordTestConfig,
    progress: Option<ProgressFn<'_>>,
) -> BenfordResult<TestResult> {
    let chi = chi_square_test(&extracted.distribution)?;
    let hotelling = hotelling_statistic(&extracted.significands)?;
    let calibration = calibrate(
        hotelling.q_statistic,
        extracted.len(),
        config.trials,
        config.seed,
        progress,
    )?;
    let fisher = fisher_combine(chi.p_value, calibration.p_value)?;

    Ok(TestResult {
        chi2_stat: chi.statistic,
        chi2_p: chi.p_value,
        hotelling_q: hotelling.q_statistic,
        hotelling_p: calibration.p_value,
        combined_stat: fisher.statistic,
        combined_p: fisher.p_value,
        conforms: fisher.p_value > config.significance_level,
        significance_level: config.significance_level,
        sample_size: extracted.len(),
        excluded_values: extracted.distribution.excluded,
        trials: calibration.trials,
        seed: calibration.seed,
        digits: digit_counts(extracted, &chi.expected_counts),
    })
}

/// Test whether `sample` conforms to Benford's law.
pub fn run_benford_test(sample: &[f64], config: &BenfordTestConfig) -> BenfordResult<TestResult> {
    config.validate()?;
    let extracted = extract_digits(sample)?;
    run_on_extracted(&extracted, config, None)
}

/// [`run_benford_test`] with a progress callback invoked after each batch of
/// Monte Carlo trials.
pub fn run_benford_test_with_progress(
    sample: &[f64],
    config: &BenfordTestConfig,
    progress: ProgressFn<'_>,
) -> BenfordResult<TestResult> {
    config.validate()?;
    let extracted = extract_digits(sample)?;
    run_on_extracted(&extracted, config, Some(progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benford::chi_square::P_VALUE_FLOOR;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::Cell;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn seeded(trials: u32, seed: u64) -> BenfordTestConfig {
        BenfordTestConfig {
            trials,
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn benford_sample(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| 10f64.powf(rng.gen::<f64>())).collect()
    }

    /// One jittered exponent per stratum `[i/n, (i+1)/n)`, so digit counts
    /// track `n p(d)` to within one value.
    fn stratified_benford_sample(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| 10f64.powf((i as f64 + rng.gen::<f64>()) / n as f64))
            .collect()
    }

    #[test]
    fn test_fisher_by_hand() {
        let f = fisher_combine(0.5, 0.5).unwrap();
        assert!(approx_eq(f.statistic, -4.0 * 0.5f64.ln(), 1e-12));
        // For df = 4 the survival function is exp(-x/2) (1 + x/2).
        let half = f.statistic / 2.0;
        assert!(approx_eq(f.p_value, (-half).exp() * (1.0 + half), 1e-9));
    }

    #[test]
    fn test_fisher_of_ones_is_one() {
        let f = fisher_combine(1.0, 1.0).unwrap();
        assert_eq!(f.statistic, 0.0);
        assert!(approx_eq(f.p_value, 1.0, 1e-12));
    }

    #[test]
    fn test_fisher_floor() {
        let f = fisher_combine(P_VALUE_FLOOR, P_VALUE_FLOOR).unwrap();
        assert_eq!(f.p_value, P_VALUE_FLOOR);
    }

    #[test]
    fn test_fisher_rejects_missing_p_values() {
        assert!(fisher_combine(0.0, 0.5).is_err());
        assert!(fisher_combine(0.5, f64::NAN).is_err());
        assert!(fisher_combine(1.2, 0.5).is_err());
        assert!(fisher_combine(0.5, -0.1).is_err());
    }

    #[test]
    fn test_hand_counted_sample() {
        let data = [12.0, 15.0, 19.0, 21.0, 31.0, 41.0, 51.0, 61.0, 71.0, 81.0, 91.0];
        let r = run_benford_test(&data, &seeded(200, 1)).unwrap();
        assert_eq!(r.observed_counts(), [3, 1, 1, 1, 1, 1, 1, 1, 1]);
        assert_eq!(r.sample_size, 11);
        let total: f64 = r.expected_counts().iter().sum();
        assert!(approx_eq(total, 11.0, 1e-9));
    }

    #[test]
    fn test_p_values_in_bounds() {
        let samples = [
            benford_sample(300, 8),
            vec![100.0; 300],
            (1..=300).map(f64::from).collect(),
        ];
        for s in samples.iter() {
            let r = run_benford_test(s, &seeded(100, 2)).unwrap();
            for p in [r.chi2_p, r.hotelling_p, r.combined_p] {
                assert!((P_VALUE_FLOOR..=1.0).contains(&p), "p={p}");
            }
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let s = benford_sample(2_000, 21);
        let a = run_benford_test(&s, &seeded(150, 42)).unwrap();
        let b = run_benford_test(&s, &seeded(150, 42)).unwrap();
        assert_eq!(a.hotelling_p.to_bits(), b.hotelling_p.to_bits());
        assert_eq!(a.combined_p.to_bits(), b.combined_p.to_bits());
        assert_eq!(a.seed, 42);
    }

    #[test]
    fn test_large_benford_sample_conforms() {
        let s = stratified_benford_sample(100_000, 42);
        let r = run_benford_test(&s, &seeded(DEFAULT_TRIALS, 42)).unwrap();
        assert!(r.combined_p > 0.05, "combined_p={}", r.combined_p);
        assert!(r.conforms);
    }

    #[test]
    fn test_stratified_sample_counts_track_expected() {
        let n = 100_000;
        let r = run_benford_test(&stratified_benford_sample(n, 42), &seeded(20, 42)).unwrap();
        let expected = r.expected_counts();
        for (o, e) in r.observed_counts().iter().zip(expected.iter()) {
            assert!((*o as f64 - e).abs() <= 2.0, "observed {o} expected {e}");
        }
        assert!(r.chi2_p > 0.99, "chi2_p={}", r.chi2_p);
    }

    #[test]
    fn test_single_digit_sample_rejected() {
        let n = 400;
        let r = run_benford_test(&vec![100.0; n], &seeded(100, 3)).unwrap();
        let p1 = BenfordModel::shared().probability(1).unwrap();
        assert_eq!(r.observed_counts()[0], n as u64);
        assert!(approx_eq(r.chi2_stat, n as f64 * (1.0 - p1) / p1, 1e-8));
        assert_eq!(r.chi2_p, P_VALUE_FLOOR);
        assert_eq!(r.hotelling_p, 1.0 / 101.0);
        assert!(!r.conforms);
    }

    #[test]
    fn test_zeros_only_is_insufficient() {
        let r = run_benford_test(&[0.0; 25], &BenfordTestConfig::default());
        assert!(matches!(r, Err(BenfordError::InsufficientData(_))));
        let r = run_benford_test(&[], &BenfordTestConfig::default());
        assert!(matches!(r, Err(BenfordError::InsufficientData(_))));
    }

    #[test]
    fn test_invalid_config() {
        let s = [1.0, 2.0];
        let bad_alpha = BenfordTestConfig {
            significance_level: 1.0,
            ..Default::default()
        };
        assert!(run_benford_test(&s, &bad_alpha).is_err());
        let zero_trials = BenfordTestConfig {
            trials: 0,
            ..Default::default()
        };
        assert!(run_benford_test(&s, &zero_trials).is_err());
    }

    #[test]
    fn test_progress_reaches_total() {
        let last = Cell::new((0usize, 0usize));
        let cb = |done: usize, total: usize| last.set((done, total));
        run_benford_test_with_progress(&benford_sample(50, 4), &seeded(75, 4), &cb).unwrap();
        assert_eq!(last.get(), (75, 75));
    }

    #[test]
    fn test_verdict_follows_significance_level() {
        let s = benford_sample(500, 31);
        let r = run_benford_test(&s, &seeded(100, 9)).unwrap();
        let strict = BenfordTestConfig {
            significance_level: 0.999_999,
            ..seeded(100, 9)
        };
        let r_strict = run_benford_test(&s, &strict).unwrap();
        assert_eq!(r.combined_p.to_bits(), r_strict.combined_p.to_bits());
        assert_eq!(r_strict.conforms, r_strict.combined_p > 0.999_999);
    }

    #[test]
    fn test_config_defaults_from_json() {
        let cfg: BenfordTestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.trials, 1000);
        assert_eq!(cfg.significance_level, 0.05);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn test_serde() {
        let r = run_benford_test(&benford_sample(100, 5), &seeded(20, 5)).unwrap();
        let j = serde_json::to_string(&r).unwrap();
        let back: TestResult = serde_json::from_str(&j).unwrap();
        assert_eq!(back.digits.len(), 9);
        assert_eq!(back.seed, 5);
    }
}
