//! # OpenTSR Schema
//!
//! The second, authoritative validation gate: signals are checked against an
//! external JSON Schema document (draft 2020-12, format assertions on).
//!
//! ## Key Types
//!
//! - [`SchemaValidator`] - A compiled schema; [`SchemaValidator::load`] caches by path
//! - [`SchemaViolation`] - One failure with its rendered path
//!
//! Violations are ordered by ascending instance path. Paths are rendered as
//! segments joined with `.`, or `<root>` for the document itself.

pub mod error;
pub mod registry;
pub mod validator;

pub use error::{Result, SchemaError, SchemaViolation};
pub use registry::{cached_count, is_cached, reset_cache};
pub use validator::{SchemaValidator, ROOT_PATH};
