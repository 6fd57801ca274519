//! # OpenTSR Core
//!
//! Pure primitives for OpenTSR: trust/telemetry signal records, their
//! identifiers, canonicalization and signing.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Signal`] - A fully validated signal record
//! - [`SignalBuilder`] - Typed construction through the same validator
//! - [`TsrId`] - Time-ordered identifier (UUIDv7)
//! - [`InvariantViolation`] - The first rule a candidate signal breaks
//!
//! ## Canonicalization
//!
//! Signals are sized, signed and persisted as canonical JSON. See the
//! [`canonical`] module.

pub mod builder;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod signal;
pub mod types;
pub mod validation;

pub use builder::SignalBuilder;
pub use canonical::{canonical_json, canonical_json_bytes, canonical_len};
pub use crypto::{SignatureAlg, SUPPORTED_SIGNATURE_ALGS};
pub use error::{CoreError, IdError, InvariantViolation, Result, SignatureError};
pub use signal::{
    ActionIntent, Env, Origin, OriginKind, ResourceRef, Safety, Signal, Trace, ValidationWarning,
    MAX_PAYLOAD_HARD_BYTES, MAX_PAYLOAD_SOFT_BYTES, MAX_TAGS, NORM_TOLERANCE, SCHEMA_VERSION,
    TSR_CONTEXT, TSR_TYPE, VECTOR_DIMS,
};
pub use types::{now_timestamp_ns, now_unix_ms, TsrId, MAX_ID_UNIX_MS, MAX_TIMESTAMP_NS};
pub use validation::{is_sha256_hex, validate_signal};
