//! Ingest configuration.

use std::path::PathBuf;

use opentsr_store::FsStore;

/// Default cold store directory.
pub const DEFAULT_COLD_DIR: &str = "cold_store";

/// Default schema document path.
pub const DEFAULT_SCHEMA_PATH: &str = "schema/opentsr.schema.json";

/// Configuration for an [`Ingestor`](crate::Ingestor).
#[derive(Clone)]
pub struct IngestConfig {
    /// Directory of `<tsr_id>.json` records.
    pub cold_dir: PathBuf,
    /// Hot index location; `<cold_dir>/hot_vectors.ndjson` when unset.
    pub hot_index: Option<PathBuf>,
    /// JSON Schema document used as the second validation gate.
    pub schema_path: PathBuf,
    /// Whether accepted signals must carry a valid signature.
    pub verify_signatures: bool,
    /// Shared key for signature verification.
    pub signature_key: Option<Vec<u8>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cold_dir: PathBuf::from(DEFAULT_COLD_DIR),
            hot_index: None,
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            verify_signatures: false,
            signature_key: None,
        }
    }
}

impl IngestConfig {
    pub fn with_cold_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cold_dir = dir.into();
        self
    }

    pub fn with_hot_index(mut self, path: impl Into<PathBuf>) -> Self {
        self.hot_index = Some(path.into());
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = path.into();
        self
    }

    /// Require signatures and verify them with `key`.
    pub fn with_signature_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.verify_signatures = true;
        self.signature_key = Some(key.into());
        self
    }

    pub fn with_verify_signatures(mut self, verify: bool) -> Self {
        self.verify_signatures = verify;
        self
    }

    /// The filesystem store this configuration describes.
    pub fn fs_store(&self) -> FsStore {
        let store = FsStore::new(&self.cold_dir);
        match &self.hot_index {
            Some(path) => store.with_hot_index(path),
            None => store,
        }
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("cold_dir", &self.cold_dir)
            .field("hot_index", &self.hot_index)
            .field("schema_path", &self.schema_path)
            .field("verify_signatures", &self.verify_signatures)
            .field("signature_key", &self.signature_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentsr_store::HOT_INDEX_FILE;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.cold_dir, PathBuf::from("cold_store"));
        assert_eq!(config.schema_path, PathBuf::from("schema/opentsr.schema.json"));
        assert!(config.hot_index.is_none());
        assert!(!config.verify_signatures);
        assert_eq!(
            config.fs_store().hot_index_path(),
            PathBuf::from("cold_store").join(HOT_INDEX_FILE)
        );
    }

    #[test]
    fn test_signature_key_enables_verification() {
        let config = IngestConfig::default().with_signature_key(b"k".to_vec());
        assert!(config.verify_signatures);
        assert!(!format!("{config:?}").contains("107"));
        assert!(format!("{config:?}").contains("<redacted>"));
    }

    #[test]
    fn test_hot_index_override() {
        let config = IngestConfig::default()
            .with_cold_dir("/tmp/cold")
            .with_hot_index("/tmp/hot/index.ndjson");
        assert_eq!(
            config.fs_store().hot_index_path(),
            PathBuf::from("/tmp/hot/index.ndjson")
        );
    }
}
