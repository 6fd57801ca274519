//! # OpenTSR Testkit
//!
//! Testing utilities for OpenTSR.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned canonical bytes and HMAC-SHA256 signatures
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Temporary cold stores, the shipped schema, sample signals
//!
//! ## Golden Vectors
//!
//! ```rust
//! use opentsr_testkit::vectors::{all_vectors, verify_vector};
//!
//! for vector in all_vectors() {
//!     verify_vector(&vector).unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use opentsr_testkit::generators::{signal_from_params, SignalParams};
//!
//! proptest! {
//!     #[test]
//!     fn canonical_bytes_are_deterministic(params: SignalParams) {
//!         let a = signal_from_params(&params, b"key");
//!         let b = signal_from_params(&params, b"key");
//!         prop_assert_eq!(a.canonical_bytes(), b.canonical_bytes());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use opentsr_testkit::fixtures::{sensor_value, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let outcome = fixture.ingestor().ingest_value(&sensor_value()).unwrap();
//! assert_eq!(outcome.status_code(), 202);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    init_test_logging, llm_agent_value, memory_ingestor, schema, schema_path, sensor_value,
    unit_vector, vector_value, TestFixture, TEST_KEY,
};
pub use generators::{signal_from_params, SignalParams};
pub use vectors::{all_vectors, verify_all_vectors, verify_vector, GoldenVector};
