//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

use opentsr::{IngestConfig, Ingestor};
use opentsr_schema::SchemaValidator;
use opentsr_store::{FsStore, MemoryStore};

/// Key used by fixtures that sign.
pub const TEST_KEY: &[u8] = b"opentsr-test-key";

static INIT_LOGGING: Once = Once::new();

/// Install a test-writer tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Root of the workspace.
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The shipped schema document.
pub fn schema_path() -> PathBuf {
    workspace_root().join("schema").join("opentsr.schema.json")
}

/// Example signals shipped next to the schema, sorted by file name.
pub fn schema_examples() -> Vec<(String, Value)> {
    let dir = workspace_root().join("schema").join("examples");
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("read {}: {e}", dir.display()))
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = fs::read_to_string(&path).expect("read example");
            let value = serde_json::from_str(&text).expect("example is JSON");
            (name, value)
        })
        .collect()
}

/// The compiled shipped schema (cached).
pub fn schema() -> Arc<SchemaValidator> {
    SchemaValidator::load(schema_path()).expect("shipped schema compiles")
}

/// A unit vector of `dim` components with its weight on the first axis.
pub fn unit_vector(dim: usize) -> Vec<f64> {
    let mut v = vec![0.0; dim];
    if let Some(first) = v.first_mut() {
        *first = 1.0;
    }
    v
}

/// A vector of `dim` equal components, normalized.
pub fn spread_vector(dim: usize) -> Vec<f64> {
    let component = 1.0 / (dim as f64).sqrt();
    vec![component; dim]
}

/// The minimal sensor signal: dev, veracity 0.5, payload `{"event": "x"}`.
pub fn sensor_value() -> Value {
    json!({
        "env": "dev",
        "origin": {"kind": "sensor", "source_id": "sensor-1"},
        "payload": {"event": "x"},
        "safety": {"veracity_score": 0.5}
    })
}

/// A sensor signal carrying a normalized vector of `dim` components.
pub fn vector_value(dim: usize) -> Value {
    let mut value = sensor_value();
    value["vector"] = json!(unit_vector(dim));
    value
}

/// A complete `llm_agent` signal.
pub fn llm_agent_value() -> Value {
    json!({
        "env": "staging",
        "origin": {"kind": "llm_agent", "source_id": "planner"},
        "payload": {"plan": "reroute"},
        "safety": {"veracity_score": 0.8},
        "agent_id": "agent://planner/1",
        "action_intent": {"action": "reroute", "target": "fleet://vehicle/7"}
    })
}

/// A filesystem ingest setup in a private temporary directory.
pub struct TestFixture {
    dir: TempDir,
    pub config: IngestConfig,
}

impl TestFixture {
    /// Cold store at `<tmp>/cold`, shipped schema, verification off.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let config = IngestConfig::default()
            .with_cold_dir(dir.path().join("cold"))
            .with_schema_path(schema_path());
        Self { dir, config }
    }

    /// Same, but signatures are required and checked against [`TEST_KEY`].
    pub fn verifying() -> Self {
        let mut fixture = Self::new();
        fixture.config = fixture.config.with_signature_key(TEST_KEY.to_vec());
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn cold_dir(&self) -> &Path {
        &self.config.cold_dir
    }

    pub fn ingestor(&self) -> Ingestor<FsStore> {
        Ingestor::from_config(&self.config).expect("fixture ingestor")
    }

    /// Every file under the fixture root, recursively.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(self.dir.path(), &mut found);
        found.sort();
        found
    }

    /// Lines of the hot index, or none if it was never written.
    pub fn hot_lines(&self) -> Vec<String> {
        fs::read_to_string(self.config.fs_store().hot_index_path())
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// An ingestor over a fresh [`MemoryStore`] and the shipped schema.
pub fn memory_ingestor() -> Ingestor<MemoryStore> {
    Ingestor::new(MemoryStore::new(), schema())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_path_exists() {
        assert!(schema_path().is_file(), "{}", schema_path().display());
    }

    #[test]
    fn test_vectors_are_normalized() {
        for dim in [1024, 1536] {
            for v in [unit_vector(dim), spread_vector(dim)] {
                let norm = v.iter().map(|c| c * c).sum::<f64>().sqrt();
                assert!((norm - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_fixture_starts_empty() {
        let fixture = TestFixture::new();
        assert!(fixture.files().is_empty());
        assert!(fixture.hot_lines().is_empty());
        assert!(fixture.cold_dir().starts_with(fixture.root()));
    }
}
