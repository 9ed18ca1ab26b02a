//! Error types for the correlation learning network.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for corrsom operations.
#[derive(Error, Debug)]
pub enum CorrsomError {
    /// A vector or matrix did not have the shape the receiver expects.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        context: String,
        /// The expected length or shape.
        expected: String,
        /// The length or shape actually supplied.
        actual: String,
    },

    /// The schedule was read outside `[0, epochs)`.
    #[error("Epoch out of range: {epoch} >= {epochs}")]
    EpochOutOfRange {
        /// The requested epoch.
        epoch: usize,
        /// Total number of epochs in the schedule.
        epochs: usize,
    },

    /// Error in SOM construction or a learning step.
    #[error("SOM error: {0}")]
    Som(String),

    /// Error while generating or loading an input dataset.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error during storage operations.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Empty input.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl CorrsomError {
    /// Builds a [`CorrsomError::DimensionMismatch`] from anything printable.
    pub fn mismatch(
        context: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        CorrsomError::DimensionMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type alias for corrsom operations.
pub type Result<T> = std::result::Result<T, CorrsomError>;

impl From<bincode::Error> for CorrsomError {
    fn from(err: bincode::Error) -> Self {
        CorrsomError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for CorrsomError {
    fn from(err: serde_json::Error) -> Self {
        CorrsomError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = CorrsomError::mismatch("input vector", 3, 2);
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in input vector: expected 3, got 2"
        );
    }

    #[test]
    fn test_epoch_message() {
        let err = CorrsomError::EpochOutOfRange { epoch: 10, epochs: 10 };
        assert_eq!(err.to_string(), "Epoch out of range: 10 >= 10");
    }
}
