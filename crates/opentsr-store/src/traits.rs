//! SignalStore trait: the abstract interface for signal persistence.
//!
//! Implementations include the filesystem store (cold directory plus hot
//! vector index) and an in-memory store for tests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use opentsr_core::{canonical_json, Signal, TsrId};

use crate::error::{Result, StoreError};

/// Result of persisting a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Where the cold record was written.
    pub cold_path: PathBuf,
    /// Whether a hot index line was appended.
    pub hot_indexed: bool,
}

/// One line of the hot vector index.
///
/// Fields are declared in key order; lines are written as canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotIndexEntry {
    pub env: String,
    pub hazard_flag: bool,
    pub origin_kind: String,
    pub tsr_id: TsrId,
    pub tsr_timestamp_ns: u64,
    pub vector_dim: usize,
}

impl HotIndexEntry {
    /// The index entry for `signal`, if it carries a vector.
    pub fn for_signal(signal: &Signal) -> Option<Self> {
        let vector = signal.vector()?;
        Some(Self {
            env: signal.env().as_str().to_string(),
            hazard_flag: signal.safety().hazard_flag,
            origin_kind: signal.origin().kind.as_str().to_string(),
            tsr_id: signal.id(),
            tsr_timestamp_ns: signal.timestamp_ns(),
            vector_dim: vector.len(),
        })
    }

    /// The compact line, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        let value =
            serde_json::to_value(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(canonical_json(&value))
    }

    /// Parse one index line.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// The SignalStore trait: synchronous interface for signal persistence.
///
/// # Design Notes
///
/// - **Append-only**: records are created or overwritten by identifier,
///   never updated in place or deleted.
/// - **Not transactional**: the cold record is written before the hot line;
///   a failure between the two leaves a record without an index entry.
/// - **Read-back re-validates**: a stored record that no longer passes the
///   signal invariants is reported as [`StoreError::InvalidRecord`].
pub trait SignalStore: Send + Sync {
    /// Persist a validated signal.
    ///
    /// # Arguments
    /// - `signal`: The signal to persist.
    /// - `canonical`: Its canonical bytes (computed once by the caller).
    fn persist(&self, signal: &Signal, canonical: &[u8]) -> Result<PersistOutcome>;

    /// Get a signal by identifier.
    fn get_signal(&self, id: &TsrId) -> Result<Option<Signal>>;

    /// Get the stored bytes for a signal.
    fn get_canonical_bytes(&self, id: &TsrId) -> Result<Option<Vec<u8>>>;

    /// Check if a signal exists.
    fn has_signal(&self, id: &TsrId) -> Result<bool> {
        Ok(self.get_canonical_bytes(id)?.is_some())
    }

    /// Identifiers of every stored signal, in ascending order.
    fn list_ids(&self) -> Result<Vec<TsrId>>;

    /// Every hot index entry, in append order.
    fn hot_entries(&self) -> Result<Vec<HotIndexEntry>>;
}

/// Decode stored bytes back into a signal, re-running validation.
///
/// The record must carry the identifier it was looked up by.
pub(crate) fn decode_record(id: &TsrId, bytes: &[u8]) -> Result<Signal> {
    let invalid = |reason: String| StoreError::InvalidRecord {
        id: id.to_string(),
        reason,
    };
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| invalid(e.to_string()))?;
    let signal = Signal::from_value(&value).map_err(|e| invalid(e.to_string()))?;
    if signal.id() != *id {
        return Err(invalid(format!("record holds tsr_id {}", signal.id())));
    }
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vector_signal() -> Signal {
        let mut vector = vec![0.0; 1536];
        vector[0] = 1.0;
        Signal::from_value(&json!({
            "tsr_id": "01920f3e-6b8a-7c41-9d2e-5f6a7b8c9d0e",
            "tsr_timestamp_ns": 17,
            "env": "staging",
            "origin": {"kind": "simulator", "source_id": "sim"},
            "payload": {},
            "safety": {"veracity_score": 0.1, "hazard_flag": true},
            "vector": vector
        }))
        .unwrap()
    }

    #[test]
    fn test_entry_line_is_sorted_and_compact() {
        let entry = HotIndexEntry::for_signal(&vector_signal()).unwrap();
        assert_eq!(
            entry.to_line().unwrap(),
            "{\"env\":\"staging\",\"hazard_flag\":true,\"origin_kind\":\"simulator\",\
             \"tsr_id\":\"01920f3e-6b8a-7c41-9d2e-5f6a7b8c9d0e\",\
             \"tsr_timestamp_ns\":17,\"vector_dim\":1536}"
        );
    }

    #[test]
    fn test_entry_line_parses_back() {
        let entry = HotIndexEntry::for_signal(&vector_signal()).unwrap();
        let line = entry.to_line().unwrap();
        assert_eq!(HotIndexEntry::from_line(&line).unwrap(), entry);
    }

    #[test]
    fn test_no_entry_without_vector() {
        let signal = Signal::from_value(&json!({
            "origin": {"kind": "sensor", "source_id": "s"},
            "payload": {},
            "safety": {"veracity_score": 0.5}
        }))
        .unwrap();
        assert!(HotIndexEntry::for_signal(&signal).is_none());
    }

    #[test]
    fn test_decode_record_rejects_tampered_bytes() {
        let id = vector_signal().id();
        let err = decode_record(&id, br#"{"env":"qa"}"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));
    }

    #[test]
    fn test_decode_record_checks_id() {
        let signal = vector_signal();
        let other = TsrId::parse("01920f3e-6b8a-7c41-9d2e-5f6a7b8c9d0f").unwrap();
        assert!(matches!(
            decode_record(&other, &signal.canonical_bytes()),
            Err(StoreError::InvalidRecord { .. })
        ));
        assert_eq!(decode_record(&signal.id(), &signal.canonical_bytes()).unwrap(), signal);
    }
}
