//! Error types for the OpenTSR core.

use thiserror::Error;

/// Errors raised while generating or parsing a signal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("uuidv7 timestamp is out of range: {0} ms")]
    TimestampOutOfRange(i64),

    #[error("system clock is before the unix epoch")]
    ClockBeforeEpoch,

    #[error("tsr_id must be a valid UUID: {0}")]
    Malformed(String),

    #[error("tsr_id must be lowercase hyphenated")]
    NotCanonical,

    #[error("tsr_id must be UUIDv7, got version {0}")]
    WrongVersion(usize),

    #[error("tsr_id must use the RFC 4122 variant")]
    WrongVariant,
}

/// A field-level or cross-field rule that a candidate signal breaks.
///
/// Construction stops at the first violation; `path` names the offending
/// field (`origin.kind`, `resources[1].sha256_hash`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct InvariantViolation {
    pub path: String,
    pub reason: String,
}

impl InvariantViolation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Signing and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("unsupported signature algorithm: {alg}. Supported: {supported}")]
    UnsupportedAlgorithm { alg: String, supported: String },

    #[error("invalid signing key")]
    InvalidKey,

    #[error("missing safety.digital_signature for verification")]
    MissingSignature,

    #[error("signature_key is required when signature verification is enabled")]
    MissingKey,

    #[error("signature verification failed")]
    Mismatch,
}

/// Umbrella error for core operations that can fail in more than one way.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invariant violation at {0}")]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Identifier(#[from] IdError),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
