//! Error types for the schema gate.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single schema failure, located by its rendered instance path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Path segments joined with `.`, or `<root>` for the document root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors that can occur while loading a schema or validating against it.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not JSON.
    #[error("schema {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The schema document root is not an object.
    #[error("schema document must be a JSON object")]
    NotAnObject,

    /// The document is JSON but not a usable JSON Schema.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An instance failed validation; carries the first violation by path.
    #[error("{0}")]
    Violation(SchemaViolation),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
