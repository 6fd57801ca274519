//! Process-wide cache of compiled schemas, keyed by path.
//!
//! Schemas are compiled once and kept for the life of the process.
//! [`reset_cache`] exists so tests can start from a cold cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use crate::error::Result;
use crate::validator::SchemaValidator;

static REGISTRY: LazyLock<RwLock<HashMap<PathBuf, Arc<SchemaValidator>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

impl SchemaValidator {
    /// Load and compile the schema at `path`, or return the cached copy.
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<SchemaValidator>> {
        let path = path.as_ref();
        if let Some(cached) = REGISTRY.read().get(path) {
            return Ok(Arc::clone(cached));
        }

        let compiled = Arc::new(SchemaValidator::from_path(path)?);
        tracing::debug!(path = %path.display(), "compiled schema");

        // Another thread may have compiled the same path meanwhile; keep the first.
        let mut registry = REGISTRY.write();
        let entry = registry
            .entry(path.to_path_buf())
            .or_insert(compiled);
        Ok(Arc::clone(entry))
    }
}

/// Drop every cached schema.
pub fn reset_cache() {
    REGISTRY.write().clear();
}

/// Number of cached schemas.
pub fn cached_count() -> usize {
    REGISTRY.read().len()
}

/// Whether `path` has a cached schema.
pub fn is_cached(path: impl AsRef<Path>) -> bool {
    REGISTRY.read().contains_key(path.as_ref())
}
