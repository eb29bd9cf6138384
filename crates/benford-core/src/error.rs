use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenfordError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate model: {0}")]
    DegenerateModel(String),

    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    #[error("Decode error in {source_kind}: {reason}")]
    Decode { source_kind: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for BenfordError {
    fn from(e: serde_json::Error) -> Self {
        BenfordError::SerializationError(e.to_string())
    }
}
