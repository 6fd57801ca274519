//! Error types for the unified API.

use opentsr_core::CoreError;
use opentsr_schema::SchemaError;
use opentsr_store::StoreError;
use thiserror::Error;

/// Errors that abort an operation instead of producing a rejection.
///
/// Invalid input is never an error here: ingest reports it as
/// [`IngestOutcome::Rejected`](crate::IngestOutcome::Rejected).
#[derive(Debug, Error)]
pub enum OpenTsrError {
    /// The schema document could not be loaded or compiled.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Storage error while persisting or reading back.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Core error while building or signing a signal.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for unified API operations.
pub type Result<T> = std::result::Result<T, OpenTsrError>;
