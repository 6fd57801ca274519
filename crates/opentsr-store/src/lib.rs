//! # OpenTSR Store
//!
//! Persistence for accepted signals. Provides a trait-based interface with
//! filesystem and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`SignalStore`] - The trait for all storage operations
//! - [`FsStore`] - Cold directory of `<tsr_id>.json` plus a hot NDJSON index
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`HotIndexEntry`] - One line of the hot vector index
//!
//! ## Usage
//!
//! ```rust,no_run
//! use opentsr_store::{FsStore, SignalStore};
//!
//! let store = FsStore::new("cold_store");
//! for entry in store.hot_entries().unwrap() {
//!     println!("{} dim={}", entry.tsr_id, entry.vector_dim);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Overwrite by identifier**: persisting the same id twice replaces the record
//! - **Hot index only for vectors**: signals without a vector are cold-only
//! - **No transactions**: a crash between the cold write and the hot append
//!   leaves a record without an index entry

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::{FsStore, HOT_INDEX_FILE};
pub use memory::MemoryStore;
pub use traits::{HotIndexEntry, PersistOutcome, SignalStore};
