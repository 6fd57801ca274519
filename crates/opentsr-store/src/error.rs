//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or index line serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted record no longer passes validation.
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
