//! Monte Carlo calibration of the Hotelling Q statistic.
//!
//! Each trial draws `n` values `10^U`, `U ~ Uniform[0, 1)`, whose
//! significands follow the Benford law exactly, and computes Q with the same
//! shared constants as the observed sample. Every trial owns a generator
//! seeded from `(base seed, trial index)`, so the simulated values do not
//! depend on how trials are split into batches or spread across threads.

use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::benford::chi_square::clamp_p_value;
use crate::benford::digits::significand;
use crate::benford::hotelling::TransformSums;
use crate::benford::model::{BenfordModel, Matrix9};
use crate::error::BenfordError;
use crate::BenfordResult;

// ---------------------------------------------------------------------------
// Constants and types
// ---------------------------------------------------------------------------

/// Default number of Monte Carlo trials.
pub const DEFAULT_TRIALS: u32 = 1000;

/// Trials simulated between two progress callbacks.
pub const TRIAL_BATCH_SIZE: usize = 50;

/// Progress callback receiving `(completed_trials, total_trials)`.
pub type ProgressFn<'a> = &'a dyn Fn(usize, usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub trials: u32,
    /// Base seed the trial generators were derived from. Replaying with this
    /// seed reproduces the run exactly.
    pub seed: u64,
    /// Trials whose simulated Q reached the observed Q.
    pub exceedances: u32,
    pub p_value: f64,
    /// Simulated Q values in trial order.
    #[serde(skip)]
    pub simulated_q: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Seeds and p-values
// ---------------------------------------------------------------------------

/// Seed for one trial, mixed from the base seed and the trial index.
pub fn trial_seed(base_seed: u64, trial_index: u64) -> u64 {
    // splitmix64 finaliser
    let mut z = base_seed
        .wrapping_add(trial_index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Number of simulated values at or above `q_observed`.
pub fn count_exceedances(q_observed: f64, simulated_q: &[f64]) -> usize {
    simulated_q.iter().filter(|&&q| q >= q_observed).count()
}

/// `(k + 1) / (B + 1)`, clamped into `[1e-10, 1]`.
pub fn p_value_from_exceedances(exceedances: usize, trials: usize) -> f64 {
    clamp_p_value((exceedances + 1) as f64 / (trials + 1) as f64)
}

/// Empirical upper-tail p-value of `q_observed` among `simulated_q`.
pub fn empirical_p_value(q_observed: f64, simulated_q: &[f64]) -> f64 {
    p_value_from_exceedances(count_exceedances(q_observed, simulated_q), simulated_q.len())
}

// ---------------------------------------------------------------------------
// Trial simulation
// ---------------------------------------------------------------------------

fn run_trial(n: usize, seed: u64, c: f64, sigma_inv: &Matrix9) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let exponent = Uniform::new(0.0, 1.0);
    let mut sums = TransformSums::default();
    for _ in 0..n {
        let x = 10f64.powf(rng.sample(exponent));
        if let Some(s) = significand(x) {
            sums.push(s);
        }
    }
    sums.q_statistic(c, sigma_inv)
}

/// Q of a single simulated trial.
pub fn simulate_trial_q(n: usize, base_seed: u64, trial_index: u64) -> BenfordResult<f64> {
    let model = BenfordModel::shared();
    let sigma_inv = model.covariance_inverse()?;
    Ok(run_trial(n, trial_seed(base_seed, trial_index), model.c(), sigma_inv))
}

#[cfg(feature = "parallel")]
fn run_batch(
    n: usize,
    base_seed: u64,
    trials: std::ops::Range<usize>,
    c: f64,
    sigma_inv: &Matrix9,
) -> Vec<f64> {
    use rayon::prelude::*;
    trials
        .into_par_iter()
        .map(|t| run_trial(n, trial_seed(base_seed, t as u64), c, sigma_inv))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_batch(
    n: usize,
    base_seed: u64,
    trials: std::ops::Range<usize>,
    c: f64,
    sigma_inv: &Matrix9,
) -> Vec<f64> {
    trials
        .map(|t| run_trial(n, trial_seed(base_seed, t as u64), c, sigma_inv))
        .collect()
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Build the empirical null distribution of Q for samples of size `n` and
/// locate `q_observed` in it.
pub fn calibrate(
    q_observed: f64,
    n: usize,
    trials: u32,
    seed: Option<u64>,
    progress: Option<ProgressFn<'_>>,
) -> BenfordResult<CalibrationResult> {
    if trials == 0 {
        return Err(BenfordError::InvalidInput {
            field: "trials".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if n == 0 {
        return Err(BenfordError::InsufficientData(
            "Calibration needs a sample size of at least one.".into(),
        ));
    }
    if q_observed.is_nan() {
        return Err(BenfordError::NumericalInstability(
            "Observed Q statistic is NaN".into(),
        ));
    }

    let model = BenfordModel::shared();
    let sigma_inv = model.covariance_inverse()?;
    let c = model.c();

    let base_seed = match seed {
        Some(s) => s,
        None => StdRng::from_entropy().gen(),
    };

    let total = trials as usize;
    let mut simulated_q = Vec::with_capacity(total);
    let mut start = 0usize;
    while start < total {
        let end = (start + TRIAL_BATCH_SIZE).min(total);
        simulated_q.extend(run_batch(n, base_seed, start..end, c, sigma_inv));
        if let Some(report) = progress {
            report(end, total);
        }
        start = end;
    }

    let exceedances = count_exceedances(q_observed, &simulated_q);
    Ok(CalibrationResult {
        trials,
        seed: base_seed,
        exceedances: exceedances as u32,
        p_value: p_value_from_exceedances(exceedances, total),
        simulated_q,
    })
}
