//! The reference ingest pipeline: parse, validate, verify, persist.
//!
//! Every call ends in exactly one of two outcomes. Rejections have no side
//! effects; storage failures are returned as errors and never retried.

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use opentsr_core::{InvariantViolation, Signal, SignatureError, TsrId};
use opentsr_schema::{SchemaError, SchemaValidator, SchemaViolation};
use opentsr_store::{FsStore, SignalStore};

use crate::config::IngestConfig;
use crate::error::{OpenTsrError, Result};

/// HTTP-style status for an accepted signal.
pub const STATUS_ACCEPTED: u16 = 202;

/// HTTP-style status for a rejected signal.
pub const STATUS_REJECTED: u16 = 400;

/// Why a candidate signal was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Unparseable text or a non-object root.
    MalformedInput(String),
    /// A field-level or cross-field rule failed.
    InvariantViolation(InvariantViolation),
    /// The schema document rejected the canonical form.
    SchemaViolation(SchemaViolation),
    /// Signature verification was required and did not pass.
    SignatureError(SignatureError),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedInput(msg) => write!(f, "invalid JSON: {msg}"),
            RejectReason::InvariantViolation(v) => write!(f, "invalid signal: {v}"),
            RejectReason::SchemaViolation(v) => write!(f, "invalid signal: {v}"),
            RejectReason::SignatureError(e) => write!(f, "invalid signal: {e}"),
        }
    }
}

/// The outcome of one ingest call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted {
        tsr_id: TsrId,
        cold_path: PathBuf,
        hot_indexed: bool,
    },
    Rejected {
        reason: RejectReason,
    },
}

impl IngestOutcome {
    fn rejected(reason: RejectReason) -> Self {
        IngestOutcome::Rejected { reason }
    }

    /// 202 for accepted, 400 for rejected.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestOutcome::Accepted { .. } => STATUS_ACCEPTED,
            IngestOutcome::Rejected { .. } => STATUS_REJECTED,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }

    /// `accepted`, or the rejection message.
    pub fn message(&self) -> String {
        match self {
            IngestOutcome::Accepted { .. } => "accepted".to_string(),
            IngestOutcome::Rejected { reason } => reason.to_string(),
        }
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            IngestOutcome::Accepted { .. } => None,
            IngestOutcome::Rejected { reason } => Some(reason),
        }
    }

    pub fn cold_path(&self) -> Option<&PathBuf> {
        match self {
            IngestOutcome::Accepted { cold_path, .. } => Some(cold_path),
            IngestOutcome::Rejected { .. } => None,
        }
    }

    pub fn hot_indexed(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { hot_indexed: true, .. })
    }
}

/// Signature policy applied between validation and persistence.
#[derive(Clone, Default)]
struct Verification {
    required: bool,
    key: Option<Vec<u8>>,
}

/// The ingest pipeline over a [`SignalStore`].
pub struct Ingestor<S: SignalStore> {
    store: S,
    schema: Arc<SchemaValidator>,
    verification: Verification,
}

impl Ingestor<FsStore> {
    /// Build a filesystem-backed ingestor, loading the schema through the cache.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let schema = SchemaValidator::load(&config.schema_path)?;
        let mut ingestor = Ingestor::new(config.fs_store(), schema);
        ingestor.verification = Verification {
            required: config.verify_signatures,
            key: config.signature_key.clone(),
        };
        Ok(ingestor)
    }
}

impl<S: SignalStore> Ingestor<S> {
    /// Create an ingestor with signature verification off.
    pub fn new(store: S, schema: Arc<SchemaValidator>) -> Self {
        Self {
            store,
            schema,
            verification: Verification::default(),
        }
    }

    /// Require signatures and verify them with `key`.
    pub fn with_signature_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.verification = Verification {
            required: true,
            key: Some(key.into()),
        };
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schema(&self) -> &SchemaValidator {
        &self.schema
    }

    /// Ingest raw JSON text.
    pub fn ingest_json(&self, text: &str) -> Result<IngestOutcome> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.ingest_value(&value),
            Err(e) => Ok(self.reject(None, RejectReason::MalformedInput(e.to_string()))),
        }
    }

    /// Ingest an already-parsed JSON value.
    pub fn ingest_value(&self, value: &Value) -> Result<IngestOutcome> {
        if !value.is_object() {
            return Ok(self.reject(
                None,
                RejectReason::MalformedInput("root must be an object".to_string()),
            ));
        }

        let signal = match Signal::from_value(value) {
            Ok(signal) => signal,
            Err(violation) => {
                return Ok(self.reject(None, RejectReason::InvariantViolation(violation)))
            }
        };

        let wire = signal.to_value();
        match self.schema.validate(&wire) {
            Ok(()) => {}
            Err(SchemaError::Violation(violation)) => {
                return Ok(self.reject(Some(&signal), RejectReason::SchemaViolation(violation)))
            }
            Err(e) => return Err(OpenTsrError::Schema(e)),
        }

        if let Err(e) = self.verify(&signal) {
            return Ok(self.reject(Some(&signal), RejectReason::SignatureError(e)));
        }

        let canonical = opentsr_core::canonical_json_bytes(&wire);
        let persisted = self.store.persist(&signal, &canonical)?;

        tracing::info!(
            tsr_id = %signal.id(),
            env = %signal.env(),
            origin_kind = %signal.origin().kind,
            hot_indexed = persisted.hot_indexed,
            "signal accepted"
        );

        Ok(IngestOutcome::Accepted {
            tsr_id: signal.id(),
            cold_path: persisted.cold_path,
            hot_indexed: persisted.hot_indexed,
        })
    }

    /// Read an accepted signal back from the store.
    pub fn get(&self, id: &TsrId) -> Result<Option<Signal>> {
        Ok(self.store.get_signal(id)?)
    }

    fn verify(&self, signal: &Signal) -> std::result::Result<(), SignatureError> {
        if !self.verification.required {
            return Ok(());
        }
        if signal.safety().digital_signature.is_none() {
            return Err(SignatureError::MissingSignature);
        }
        let key = self
            .verification
            .key
            .as_deref()
            .ok_or(SignatureError::MissingKey)?;
        if signal.verify(key) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn reject(&self, signal: Option<&Signal>, reason: RejectReason) -> IngestOutcome {
        match signal {
            Some(signal) => tracing::warn!(tsr_id = %signal.id(), %reason, "signal rejected"),
            None => tracing::warn!(%reason, "signal rejected"),
        }
        IngestOutcome::rejected(reason)
    }
}
