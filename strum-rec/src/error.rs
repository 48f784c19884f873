//! Error types for strum-rec
//!
//! Provider-class failures never reach this type: they are recovered inside the
//! identification chain, the aggregator and enrichment. Only input problems are
//! caller-visible.

use thiserror::Error;

/// Caller-visible `Recommend` failure
#[derive(Debug, Error)]
pub enum RecommendError {
    /// No feature vector was supplied
    #[error("Input missing: {0}")]
    InputMissing(String),

    /// Feature vector present but violates analyzer invariants
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for recommendation operations
pub type RecommendResult<T> = Result<T, RecommendError>;
