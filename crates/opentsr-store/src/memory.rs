//! In-memory implementation of the SignalStore trait.
//!
//! This is primarily for testing. It has the same semantics as the
//! filesystem store but keeps everything in memory with no persistence.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;

use opentsr_core::{Signal, TsrId};

use crate::error::Result;
use crate::traits::{decode_record, HotIndexEntry, PersistOutcome, SignalStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    /// Canonical bytes indexed by identifier.
    records: BTreeMap<TsrId, Vec<u8>>,

    /// Hot index, in append order.
    hot: Vec<HotIndexEntry>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored signals.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalStore for MemoryStore {
    fn persist(&self, signal: &Signal, canonical: &[u8]) -> Result<PersistOutcome> {
        let mut inner = self.inner.write();
        inner.records.insert(signal.id(), canonical.to_vec());

        let entry = HotIndexEntry::for_signal(signal);
        let hot_indexed = entry.is_some();
        inner.hot.extend(entry);

        Ok(PersistOutcome {
            cold_path: PathBuf::from(format!("{}.json", signal.id())),
            hot_indexed,
        })
    }

    fn get_signal(&self, id: &TsrId) -> Result<Option<Signal>> {
        self.get_canonical_bytes(id)?
            .map(|bytes| decode_record(id, &bytes))
            .transpose()
    }

    fn get_canonical_bytes(&self, id: &TsrId) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    fn list_ids(&self) -> Result<Vec<TsrId>> {
        Ok(self.inner.read().records.keys().copied().collect())
    }

    fn hot_entries(&self) -> Result<Vec<HotIndexEntry>> {
        Ok(self.inner.read().hot.clone())
    }
}
