//! One-call analysis of a sample: discrepancy metrics, chi-squared, and the
//! combined test, wrapped in the standard computation envelope.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use crate::benford::calibration::ProgressFn;
use crate::benford::chi_square::{chi_square_test, ChiSquareResult};
use crate::benford::combined::{
    digit_counts, run_on_extracted, BenfordTestConfig, DigitCount, TestResult,
};
use crate::benford::digits::extract_digits;
use crate::benford::metrics::{compute_discrepancy_metrics, DiscrepancyMetrics};
use crate::error::BenfordError;
use crate::types::{with_metadata, ComputationOutput};
use crate::BenfordResult;

/// Expected digit counts below this make the chi-squared approximation weak.
const MIN_EXPECTED_COUNT: f64 = 5.0;

/// Monte Carlo runs below this many trials give a coarse p-value.
const MIN_RECOMMENDED_TRIALS: u32 = 100;

/// Input for a full Benford analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenfordAnalysisInput {
    /// Optional name carried into the output, e.g. the source file.
    #[serde(default)]
    pub label: Option<String>,
    pub sample: Vec<f64>,
    #[serde(flatten)]
    pub config: BenfordTestConfig,
}

/// Output of a full Benford analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenfordAnalysisOutput {
    pub label: Option<String>,
    pub sample_size: usize,
    pub excluded_values: usize,
    pub digits: Vec<DigitCount>,
    pub metrics: DiscrepancyMetrics,
    pub chi_square: ChiSquareResult,
    /// Combined test; absent when the Hotelling branch could not be computed.
    pub test: Option<TestResult>,
}

/// Discrepancy metrics of a raw sample against Benford expected counts.
pub fn sample_discrepancy_metrics(sample: &[f64]) -> BenfordResult<DiscrepancyMetrics> {
    let extracted = extract_digits(sample)?;
    let chi = chi_square_test(&extracted.distribution)?;
    compute_discrepancy_metrics(&extracted.distribution.observed(), &chi.expected_counts)
}

/// Run the full analysis.
///
/// Insufficient data and a degenerate model abort the analysis. A failure to
/// invert the covariance matrix only drops the combined test: metrics and the
/// chi-squared result are still returned, with a warning.
pub fn analyze_sample(
    input: &BenfordAnalysisInput,
) -> BenfordResult<ComputationOutput<BenfordAnalysisOutput>> {
    analyze_sample_with_progress(input, None)
}

pub fn analyze_sample_with_progress(
    input: &BenfordAnalysisInput,
    progress: Option<ProgressFn<'_>>,
) -> BenfordResult<ComputationOutput<BenfordAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    input.config.validate()?;

    let extracted = extract_digits(&input.sample)?;
    if extracted.distribution.excluded > 0 {
        warnings.push(format!(
            "{} of {} values were zero, NaN or infinite and were excluded",
            extracted.distribution.excluded,
            input.sample.len()
        ));
    }

    let chi = chi_square_test(&extracted.distribution)?;
    let sparse: Vec<String> = chi
        .expected_counts
        .iter()
        .enumerate()
        .filter(|(_, e)| **e < MIN_EXPECTED_COUNT)
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    if !sparse.is_empty() {
        warnings.push(format!(
            "Expected count below {MIN_EXPECTED_COUNT} for digit(s) {}; chi-squared p-value is approximate",
            sparse.join(", ")
        ));
    }
    if input.config.trials < MIN_RECOMMENDED_TRIALS {
        warnings.push(format!(
            "Only {} Monte Carlo trials; Hotelling p-value resolution is 1/{}",
            input.config.trials,
            input.config.trials + 1
        ));
    }

    let metrics =
        compute_discrepancy_metrics(&extracted.distribution.observed(), &chi.expected_counts)?;

    let test = match run_on_extracted(&extracted, &input.config, progress) {
        Ok(result) => Some(result),
        Err(BenfordError::NumericalInstability(reason)) => {
            warnings.push(format!("Combined test skipped: {reason}"));
            None
        }
        Err(e) => return Err(e),
    };

    let output = BenfordAnalysisOutput {
        label: input.label.clone(),
        sample_size: extracted.len(),
        excluded_values: extracted.distribution.excluded,
        digits: digit_counts(&extracted, &chi.expected_counts),
        metrics,
        chi_square: chi,
        test,
    };

    let assumptions = json!({
        "null_model": "p(d) = log10(1 + 1/d), d = 1..9",
        "trials": input.config.trials,
        "significance_level": input.config.significance_level,
        "seed": output.test.as_ref().map(|t| t.seed).or(input.config.seed),
        "combination": "Fisher, chi-squared with 4 degrees of freedom",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Benford first-digit test: Pearson chi-squared + Monte Carlo calibrated Hotelling Q, combined by Fisher's method",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}
