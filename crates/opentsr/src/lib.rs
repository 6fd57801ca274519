//! # OpenTSR
//!
//! The unified API for OpenTSR trust/telemetry signal records: validation,
//! signing and the reference ingest pipeline.
//!
//! ## Overview
//!
//! - **Signals**: structured events from agents, sensors or services, carrying
//!   provenance, safety metadata and an optional embedding vector
//! - **Validation**: field and cross-field invariants at construction, then a
//!   JSON Schema gate
//! - **Signing**: HMAC-SHA256 over the canonical signable form
//! - **Ingest**: accept (202) or reject (400); accepted signals land in a cold
//!   store and, when they carry a vector, a hot index
//!
//! ## Usage
//!
//! ```rust,no_run
//! use opentsr::{IngestConfig, Ingestor};
//!
//! let config = IngestConfig::default().with_cold_dir("/var/lib/opentsr/cold");
//! let ingestor = Ingestor::from_config(&config).unwrap();
//!
//! let outcome = ingestor
//!     .ingest_json(r#"{"origin":{"kind":"sensor","source_id":"probe"},
//!                     "payload":{"event":"x"},"safety":{"veracity_score":0.5}}"#)
//!     .unwrap();
//! println!("{} {}", outcome.status_code(), outcome.message());
//! ```
//!
//! ## Re-exports
//!
//! - `opentsr::core` - Signal model, canonicalization, signing
//! - `opentsr::schema` - JSON Schema gate
//! - `opentsr::store` - Cold store and hot index

pub mod config;
pub mod error;
pub mod ingest;

// Re-export component crates
pub use opentsr_core as core;
pub use opentsr_schema as schema;
pub use opentsr_store as store;

pub use config::{IngestConfig, DEFAULT_COLD_DIR, DEFAULT_SCHEMA_PATH};
pub use error::{OpenTsrError, Result};
pub use ingest::{IngestOutcome, Ingestor, RejectReason, STATUS_ACCEPTED, STATUS_REJECTED};

// Re-export commonly used types
pub use opentsr_core::{
    ActionIntent, Env, InvariantViolation, Origin, OriginKind, ResourceRef, Safety, Signal,
    SignalBuilder, SignatureError, Trace, TsrId,
};
pub use opentsr_schema::{SchemaValidator, SchemaViolation};
pub use opentsr_store::{FsStore, MemoryStore, SignalStore};
