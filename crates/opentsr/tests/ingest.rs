//! End-to-end ingest behavior against a temporary filesystem store.

use std::fs;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use serde_json::{json, Value};

use opentsr::store::HotIndexEntry;
use opentsr::{
    Env, IngestConfig, IngestOutcome, Ingestor, OpenTsrError, Origin, OriginKind, RejectReason,
    Safety, SignalBuilder, SignalStore,
};
use opentsr_testkit::{
    init_test_logging, llm_agent_value, memory_ingestor, schema_path, sensor_value, unit_vector,
    vector_value, TestFixture, TEST_KEY,
};

fn rejection(outcome: &IngestOutcome) -> &RejectReason {
    outcome
        .reject_reason()
        .unwrap_or_else(|| panic!("expected rejection, got {outcome:?}"))
}

fn signed(mut value: Value, key: &[u8]) -> Value {
    let mut signal = opentsr::Signal::from_value(&value).unwrap();
    signal.sign(key, "hmac-sha256").unwrap();
    value["tsr_id"] = json!(signal.id().to_string());
    value["tsr_timestamp_ns"] = json!(signal.timestamp_ns());
    value["safety"] = signal.to_value()["safety"].clone();
    value
}

#[test]
fn malformed_json_is_rejected_without_side_effects() -> Result<()> {
    init_test_logging();
    let fixture = TestFixture::new();
    let outcome = fixture.ingestor().ingest_json("{ not json")?;

    assert_eq!(outcome.status_code(), 400);
    assert!(matches!(rejection(&outcome), RejectReason::MalformedInput(_)));
    assert!(outcome.message().starts_with("invalid JSON: "));
    assert!(outcome.cold_path().is_none());
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn non_object_root_is_rejected() -> Result<()> {
    let fixture = TestFixture::new();
    for text in ["[1, 2, 3]", "\"signal\"", "42", "null"] {
        let outcome = fixture.ingestor().ingest_json(text)?;
        assert_eq!(outcome.message(), "invalid JSON: root must be an object");
    }
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn vector_signal_is_cold_stored_and_hot_indexed() -> Result<()> {
    init_test_logging();
    let fixture = TestFixture::new();
    let outcome = fixture.ingestor().ingest_value(&vector_value(1024))?;

    assert_eq!(outcome.status_code(), 202);
    assert_eq!(outcome.message(), "accepted");
    assert!(outcome.hot_indexed());

    let IngestOutcome::Accepted {
        tsr_id, cold_path, ..
    } = &outcome
    else {
        panic!("expected acceptance");
    };
    assert_eq!(cold_path, &fixture.cold_dir().join(format!("{tsr_id}.json")));

    let records: Vec<_> = fs::read_dir(fixture.cold_dir())?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
        .collect();
    assert_eq!(records.len(), 1);

    let lines = fixture.hot_lines();
    assert_eq!(lines.len(), 1);
    let entry = HotIndexEntry::from_line(&lines[0])?;
    assert_eq!(entry.tsr_id, *tsr_id);
    assert_eq!(entry.vector_dim, 1024);
    assert_eq!(entry.env, "dev");
    assert_eq!(entry.origin_kind, "sensor");
    assert!(!entry.hazard_flag);
    Ok(())
}

#[test]
fn hot_line_is_compact_with_sorted_keys() -> Result<()> {
    let fixture = TestFixture::new();
    fixture.ingestor().ingest_value(&vector_value(1536))?;

    let line = &fixture.hot_lines()[0];
    assert!(!line.contains(' '));
    let keys: Vec<String> = serde_json::from_str::<Value>(line)?
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(
        keys,
        ["env", "hazard_flag", "origin_kind", "tsr_id", "tsr_timestamp_ns", "vector_dim"]
    );
    assert!(line.starts_with("{\"env\":"));
    assert!(line.ends_with("\"vector_dim\":1536}"));
    Ok(())
}

#[test]
fn signal_without_vector_is_cold_only() -> Result<()> {
    let fixture = TestFixture::new();
    let outcome = fixture.ingestor().ingest_value(&sensor_value())?;

    assert!(outcome.is_accepted());
    assert!(!outcome.hot_indexed());
    assert!(fixture.hot_lines().is_empty());
    assert_eq!(fixture.files().len(), 1);
    Ok(())
}

#[test]
fn cold_record_is_canonical_and_reads_back() -> Result<()> {
    let fixture = TestFixture::new();
    let ingestor = fixture.ingestor();
    let outcome = ingestor.ingest_value(&llm_agent_value())?;
    let IngestOutcome::Accepted {
        tsr_id, cold_path, ..
    } = outcome
    else {
        panic!("expected acceptance");
    };

    let stored = ingestor.get(&tsr_id)?.expect("record exists");
    assert_eq!(fs::read(&cold_path)?, stored.canonical_bytes());
    assert_eq!(stored.origin().kind, OriginKind::LlmAgent);
    assert_eq!(ingestor.store().list_ids()?, vec![tsr_id]);
    Ok(())
}

#[test]
fn invariant_violation_is_rejected() -> Result<()> {
    let fixture = TestFixture::new();
    let mut value = llm_agent_value();
    value.as_object_mut().unwrap().remove("agent_id");

    let outcome = fixture.ingestor().ingest_value(&value)?;
    assert_eq!(
        outcome.message(),
        "invalid signal: agent_id: is required when origin.kind is llm_agent"
    );
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn wrong_vector_dimension_is_rejected() -> Result<()> {
    let fixture = TestFixture::new();
    let mut value = sensor_value();
    value["vector"] = json!(unit_vector(100));

    let outcome = fixture.ingestor().ingest_value(&value)?;
    match rejection(&outcome) {
        RejectReason::InvariantViolation(v) => assert_eq!(v.path, "vector"),
        other => panic!("unexpected reason {other:?}"),
    }
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn prod_without_signature_is_rejected() -> Result<()> {
    let fixture = TestFixture::new();
    let mut value = sensor_value();
    value["env"] = json!("prod");

    let outcome = fixture.ingestor().ingest_value(&value)?;
    assert_eq!(
        outcome.message(),
        "invalid signal: safety.digital_signature: is required when env is prod"
    );
    Ok(())
}

#[test]
fn schema_gate_catches_what_the_model_allows() -> Result<()> {
    let fixture = TestFixture::new();
    let mut value = sensor_value();
    value["resources"] = json!([{
        "blob_url": "not a uri",
        "sha256_hash": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
    }]);

    let outcome = fixture.ingestor().ingest_value(&value)?;
    match rejection(&outcome) {
        RejectReason::SchemaViolation(v) => assert_eq!(v.path, "resources.0.blob_url"),
        other => panic!("unexpected reason {other:?}"),
    }
    assert!(outcome.message().starts_with("invalid signal: resources.0.blob_url: "));
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn verification_requires_a_signature() -> Result<()> {
    let fixture = TestFixture::verifying();
    let outcome = fixture.ingestor().ingest_value(&sensor_value())?;
    assert_eq!(
        outcome.message(),
        "invalid signal: missing safety.digital_signature for verification"
    );
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn verification_requires_a_key() -> Result<()> {
    let mut fixture = TestFixture::new();
    fixture.config = fixture.config.clone().with_verify_signatures(true);

    let outcome = fixture.ingestor().ingest_value(&signed(sensor_value(), TEST_KEY))?;
    assert_eq!(
        outcome.message(),
        "invalid signal: signature_key is required when signature verification is enabled"
    );
    Ok(())
}

#[test]
fn verification_accepts_matching_key_only() -> Result<()> {
    let fixture = TestFixture::verifying();

    let good = fixture.ingestor().ingest_value(&signed(vector_value(1024), TEST_KEY))?;
    assert!(good.is_accepted());

    let bad = fixture.ingestor().ingest_value(&signed(sensor_value(), b"someone-else"))?;
    assert_eq!(bad.message(), "invalid signal: signature verification failed");
    assert_eq!(fixture.hot_lines().len(), 1);
    Ok(())
}

#[test]
fn signed_prod_signal_from_builder_is_accepted() -> Result<()> {
    let fixture = TestFixture::verifying();
    let signal = SignalBuilder::new(
        Origin::new(OriginKind::Service, "billing-api"),
        json!({"invoice": "INV-1"}),
        Safety::new(0.99),
    )
    .env(Env::Prod)
    .build_signed(TEST_KEY, "hmac-sha256")?;

    let outcome = fixture.ingestor().ingest_value(&signal.to_value())?;
    assert!(outcome.is_accepted(), "{}", outcome.message());
    Ok(())
}

#[test]
fn custom_hot_index_location() -> Result<()> {
    let fixture = TestFixture::new();
    let hot = fixture.root().join("index").join("vectors.ndjson");
    let config = fixture.config.clone().with_hot_index(&hot);

    let outcome = Ingestor::from_config(&config)?.ingest_value(&vector_value(1536))?;
    assert!(outcome.hot_indexed());
    assert_eq!(fs::read_to_string(&hot)?.lines().count(), 1);
    assert!(!fixture.cold_dir().join("hot_vectors.ndjson").exists());
    Ok(())
}

#[test]
fn storage_failure_is_an_error() -> Result<()> {
    let fixture = TestFixture::new();
    let blocker = fixture.root().join("blocker");
    fs::write(&blocker, "not a directory")?;
    let config = fixture.config.clone().with_cold_dir(&blocker);

    let result = Ingestor::from_config(&config)?.ingest_value(&sensor_value());
    assert!(matches!(result, Err(OpenTsrError::Store(_))));
    Ok(())
}

#[test]
fn missing_schema_is_an_error() {
    let config = IngestConfig::default().with_schema_path("does/not/exist.json");
    assert!(matches!(
        Ingestor::from_config(&config),
        Err(OpenTsrError::Schema(_))
    ));
}

#[test]
fn memory_store_pipeline() -> Result<()> {
    let ingestor = memory_ingestor();
    ingestor.ingest_value(&sensor_value())?;
    ingestor.ingest_value(&vector_value(1024))?;
    let rejected = ingestor.ingest_json("{")?;

    assert!(!rejected.is_accepted());
    assert_eq!(ingestor.store().len(), 2);
    assert_eq!(ingestor.store().hot_entries()?.len(), 1);
    Ok(())
}

#[test]
fn concurrent_ingest_keeps_index_lines_whole() -> Result<()> {
    let fixture = TestFixture::new();
    let ingestor = Arc::new(fixture.ingestor());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ingestor = Arc::clone(&ingestor);
            thread::spawn(move || {
                for _ in 0..5 {
                    let outcome = ingestor.ingest_value(&vector_value(1024)).unwrap();
                    assert!(outcome.is_accepted());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("ingest thread panicked");
    }

    let entries = ingestor.store().hot_entries()?;
    assert_eq!(entries.len(), 20);
    assert_eq!(ingestor.store().list_ids()?.len(), 20);
    assert_eq!(schema_path(), fixture.config.schema_path);
    Ok(())
}

#[test]
fn soft_limit_payload_is_accepted_and_stored() -> Result<()> {
    init_test_logging();
    let fixture = TestFixture::new();
    let mut value = sensor_value();
    value["payload"] = json!({"event": "bulk", "blob": "x".repeat(2 * 1024 * 1024)});

    let outcome = fixture.ingestor().ingest_value(&value)?;
    assert_eq!(outcome.status_code(), 202, "{}", outcome.message());

    let path = outcome.cold_path().expect("accepted signal has a cold path");
    let stored: Value = serde_json::from_slice(&fs::read(path)?)?;
    assert_eq!(stored["payload"], value["payload"]);
    assert_eq!(fixture.files().len(), 1);
    Ok(())
}

#[test]
fn explicit_null_for_defaulted_field_is_rejected() -> Result<()> {
    let fixture = TestFixture::new();
    for key in ["env", "tsr_id", "tsr_timestamp_ns", "@context", "@type", "schema_version"] {
        let mut value = sensor_value();
        value[key] = Value::Null;

        let outcome = fixture.ingestor().ingest_value(&value)?;
        assert_eq!(outcome.status_code(), 400, "{key}");
        match rejection(&outcome) {
            RejectReason::InvariantViolation(v) => assert_eq!(v.path, key),
            other => panic!("{key}: unexpected reason {other:?}"),
        }
    }
    assert!(fixture.files().is_empty());
    Ok(())
}

#[test]
fn explicit_null_for_optional_field_is_absent() -> Result<()> {
    let fixture = TestFixture::new();
    let mut value = sensor_value();
    value["vector"] = Value::Null;
    value["tags"] = Value::Null;

    let outcome = fixture.ingestor().ingest_value(&value)?;
    assert!(outcome.is_accepted(), "{}", outcome.message());
    assert!(!outcome.hot_indexed());
    Ok(())
}
