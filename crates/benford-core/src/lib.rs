pub mod benford;
pub mod error;
pub mod types;

#[cfg(feature = "sources")]
pub mod sources;

pub use benford::analysis::{analyze_sample, BenfordAnalysisInput, BenfordAnalysisOutput};
pub use benford::combined::{
    run_benford_test, run_benford_test_with_progress, BenfordTestConfig, TestResult,
};
pub use benford::metrics::{compute_discrepancy_metrics, DiscrepancyMetrics};
pub use error::BenfordError;
pub use types::*;

/// Standard result type for all Benford operations
pub type BenfordResult<T> = Result<T, BenfordError>;
