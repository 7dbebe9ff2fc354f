//! Error taxonomy for the forecasting and projection pipeline
//!
//! Every public operation either returns a fully populated result or one of
//! these typed errors. Validation happens before any computation, so a
//! failed call never leaves partial output behind.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the forecasting and projection core
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input series is too short for the requested model
    #[error("insufficient data: need at least {needed} observations, got {actual}")]
    InsufficientData { needed: usize, actual: usize },

    /// Invalid configuration supplied by the caller (weights, horizon, columns)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Input data failed validation (ordering, sign, finiteness)
    #[error("validation failed: {0}")]
    Validation(String),

    /// The base year exists in the price index but cannot anchor a ratio
    #[error("base year {year} cannot anchor the price index: {reason}")]
    MissingBaseYear { year: i32, reason: String },

    /// A ratio with a non-positive denominator was requested
    #[error("division undefined: {0}")]
    DivisionUndefined(String),

    /// Model training exceeded the configured timeout
    #[error("model training exceeded timeout of {0:?}")]
    TrainingTimeout(Duration),

    /// Every model in an ensemble was missing or failed
    #[error("ensemble failure: {0}")]
    EnsembleFailure(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = EngineError::InsufficientData { needed: 2, actual: 1 };
        assert!(err.to_string().contains("at least 2"));

        let err = EngineError::MissingBaseYear {
            year: 2020,
            reason: "index value is zero".into(),
        };
        assert!(err.to_string().contains("2020"));
    }
}
