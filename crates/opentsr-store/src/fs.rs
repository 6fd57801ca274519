//! Filesystem store: one canonical JSON file per signal plus an
//! append-only NDJSON index of vector-bearing signals.

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use opentsr_core::{Signal, TsrId};

use crate::error::Result;
use crate::traits::{decode_record, HotIndexEntry, PersistOutcome, SignalStore};

/// File name of the hot index inside the cold directory.
pub const HOT_INDEX_FILE: &str = "hot_vectors.ndjson";

/// Filesystem-backed store.
///
/// Cold records live at `<cold_dir>/<tsr_id>.json`. Hot index appends from
/// one store are serialized; each line goes out in a single write on a file
/// opened in append mode.
#[derive(Debug)]
pub struct FsStore {
    cold_dir: PathBuf,
    hot_index: PathBuf,
    append_lock: Mutex<()>,
}

impl FsStore {
    /// A store rooted at `cold_dir`, with the hot index inside it.
    ///
    /// Nothing is created until the first write.
    pub fn new(cold_dir: impl Into<PathBuf>) -> Self {
        let cold_dir = cold_dir.into();
        let hot_index = cold_dir.join(HOT_INDEX_FILE);
        Self {
            cold_dir,
            hot_index,
            append_lock: Mutex::new(()),
        }
    }

    /// Put the hot index somewhere other than the cold directory.
    pub fn with_hot_index(mut self, path: impl Into<PathBuf>) -> Self {
        self.hot_index = path.into();
        self
    }

    pub fn cold_dir(&self) -> &Path {
        &self.cold_dir
    }

    pub fn hot_index_path(&self) -> &Path {
        &self.hot_index
    }

    /// Path of the cold record for `id`.
    pub fn record_path(&self, id: &TsrId) -> PathBuf {
        self.cold_dir.join(format!("{id}.json"))
    }

    fn append_hot(&self, line: &str) -> Result<()> {
        let _guard = self.append_lock.lock();

        if let Some(parent) = self.hot_index.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.hot_index)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        Ok(())
    }
}

impl SignalStore for FsStore {
    fn persist(&self, signal: &Signal, canonical: &[u8]) -> Result<PersistOutcome> {
        fs::create_dir_all(&self.cold_dir)?;

        let cold_path = self.record_path(&signal.id());
        fs::write(&cold_path, canonical)?;
        tracing::debug!(
            tsr_id = %signal.id(),
            path = %cold_path.display(),
            bytes = canonical.len(),
            "wrote cold record"
        );

        let hot_indexed = match HotIndexEntry::for_signal(signal) {
            Some(entry) => {
                self.append_hot(&entry.to_line()?)?;
                tracing::debug!(
                    tsr_id = %signal.id(),
                    path = %self.hot_index.display(),
                    vector_dim = entry.vector_dim,
                    "appended hot index entry"
                );
                true
            }
            None => false,
        };

        Ok(PersistOutcome {
            cold_path,
            hot_indexed,
        })
    }

    fn get_signal(&self, id: &TsrId) -> Result<Option<Signal>> {
        self.get_canonical_bytes(id)?
            .map(|bytes| decode_record(id, &bytes))
            .transpose()
    }

    fn get_canonical_bytes(&self, id: &TsrId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.record_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_ids(&self) -> Result<Vec<TsrId>> {
        let entries = match fs::read_dir(&self.cold_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            // Anything that is not `<tsr_id>.json` is not ours.
            if let Ok(id) = TsrId::parse(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn hot_entries(&self) -> Result<Vec<HotIndexEntry>> {
        let text = match fs::read_to_string(&self.hot_index) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(HotIndexEntry::from_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentsr_core::canonical_json_bytes;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn signal(with_vector: bool) -> Signal {
        let mut value = json!({
            "origin": {"kind": "sensor", "source_id": "probe"},
            "payload": {"event": "x"},
            "safety": {"veracity_score": 0.5}
        });
        if with_vector {
            let mut vector = vec![0.0; 1024];
            vector[1] = 1.0;
            value["vector"] = json!(vector);
        }
        Signal::from_value(&value).unwrap()
    }

    fn persist(store: &FsStore, signal: &Signal) -> PersistOutcome {
        store.persist(signal, &signal.canonical_bytes()).unwrap()
    }

    #[test]
    fn test_persist_without_vector() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path().join("cold"));
        let s = signal(false);

        let outcome = persist(&store, &s);
        assert!(!outcome.hot_indexed);
        assert_eq!(outcome.cold_path, store.record_path(&s.id()));
        assert_eq!(fs::read(&outcome.cold_path).unwrap(), s.canonical_bytes());
        assert!(!store.hot_index_path().exists());
    }

    #[test]
    fn test_persist_with_vector_appends_line() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let s = signal(true);

        assert!(persist(&store, &s).hot_indexed);
        let entries = store.hot_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tsr_id, s.id());
        assert_eq!(entries[0].vector_dim, 1024);
        assert_eq!(entries[0].origin_kind, "sensor");
    }

    #[test]
    fn test_custom_hot_index_creates_parents() {
        let dir = TempDir::new().unwrap();
        let hot = dir.path().join("hot").join("nested").join("index.ndjson");
        let store = FsStore::new(dir.path().join("cold")).with_hot_index(&hot);

        persist(&store, &signal(true));
        assert!(hot.exists());
        assert!(!store.cold_dir().join(HOT_INDEX_FILE).exists());
    }

    #[test]
    fn test_roundtrip_read_back() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let s = signal(false);
        persist(&store, &s);

        assert!(store.has_signal(&s.id()).unwrap());
        assert_eq!(store.get_signal(&s.id()).unwrap(), Some(s));
    }

    #[test]
    fn test_missing_signal() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let id = TsrId::generate().unwrap();
        assert_eq!(store.get_signal(&id).unwrap(), None);
        assert!(!store.has_signal(&id).unwrap());
    }

    #[test]
    fn test_overwrite_by_id() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let s = signal(false);

        store.persist(&s, b"{}").unwrap();
        persist(&store, &s);
        assert_eq!(store.list_ids().unwrap(), vec![s.id()]);
        assert_eq!(
            store.get_canonical_bytes(&s.id()).unwrap().unwrap(),
            s.canonical_bytes()
        );
    }

    #[test]
    fn test_tampered_record_is_invalid() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let s = signal(false);

        let mut value: Value = s.to_value();
        value["safety"]["veracity_score"] = json!(7);
        store.persist(&s, &canonical_json_bytes(&value)).unwrap();

        assert!(matches!(
            store.get_signal(&s.id()),
            Err(crate::StoreError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_renamed_record_is_invalid() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let s = signal(false);
        persist(&store, &s);

        let other = TsrId::generate().unwrap();
        fs::rename(store.record_path(&s.id()), store.record_path(&other)).unwrap();

        match store.get_signal(&other) {
            Err(crate::StoreError::InvalidRecord { id, reason }) => {
                assert_eq!(id, other.to_string());
                assert!(reason.contains(&s.id().to_string()));
            }
            result => panic!("expected invalid record, got {result:?}"),
        }
    }

    #[test]
    fn test_list_ids_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let a = signal(true);
        let b = signal(false);
        persist(&store, &a);
        persist(&store, &b);
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let mut expected = vec![a.id(), b.id()];
        expected.sort();
        assert_eq!(store.list_ids().unwrap(), expected);
    }

    #[test]
    fn test_list_ids_on_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path().join("never-created"));
        assert!(store.list_ids().unwrap().is_empty());
        assert!(store.hot_entries().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_appends_keep_lines_whole() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsStore::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..10 {
                        let s = signal(true);
                        store.persist(&s, &s.canonical_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = store.hot_entries().unwrap();
        assert_eq!(entries.len(), 80);
        assert_eq!(store.list_ids().unwrap().len(), 80);
    }
}
