//! Error types shared across the republisher crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// A row whose fields cannot be turned into an [`Identifier`](crate::types::Identifier)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed row [{row}]: {reason}")]
pub struct MalformedRowError {
    /// The offending row, comma-joined for display
    pub row: String,
    /// Why the conversion failed
    pub reason: String,
}

impl MalformedRowError {
    pub fn new(row: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for shared operations
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    MalformedRow(#[from] MalformedRowError),
}
