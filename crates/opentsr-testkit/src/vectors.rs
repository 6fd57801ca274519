//! Golden test vectors for cross-implementation verification.
//!
//! Each vector pins the canonical signed form of a signal, its signable
//! bytes and the HMAC-SHA256 signature. Any implementation must reproduce
//! all three byte-for-byte. The bytes are those of Python's `json.dumps`
//! with sorted keys, compact separators and ASCII escapes.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

use opentsr_core::Signal;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Shared signing key.
    pub key: &'static [u8],
    /// Canonical JSON of the signable form.
    pub signable: &'static str,
    /// Expected `safety.digital_signature`.
    pub signature: &'static str,
    /// Canonical JSON of the signed wire form.
    pub canonical: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "minimal sensor",
            key: b"opentsr-golden-key",
            signable: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"dev","origin":{"kind":"sensor","source_id":"probe-1"},"payload":{"event":"x"},"safety":{"hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":0.5},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c00-7000-8000-000000000001","tsr_timestamp_ns":1706000000000000000}"#,
            signature: "s5Mu3oItals2zk22+npSq7lTwGR7w6/K9BLrF7tixkk=",
            canonical: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"dev","origin":{"kind":"sensor","source_id":"probe-1"},"payload":{"event":"x"},"safety":{"digital_signature":"s5Mu3oItals2zk22+npSq7lTwGR7w6/K9BLrF7tixkk=","hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":0.5},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c00-7000-8000-000000000001","tsr_timestamp_ns":1706000000000000000}"#,
        },
        GoldenVector {
            name: "llm agent with intent and tags",
            key: b"opentsr-golden-key",
            signable: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","action_intent":{"action":"dispatch","reason":"queue drained","target":"task://42"},"agent_id":"agent://planner/1","env":"staging","origin":{"kind":"llm_agent","namespace":"ops","source_id":"planner"},"payload":{"plan":["scan","report"],"step":2},"safety":{"hazard_flag":true,"signature_alg":"hmac-sha256","veracity_score":0.75},"schema_version":"1.0.0-draft","tags":["planning","ops"],"trace":{"span_id":"span-2","trace_id":"trace-1"},"tsr_id":"018d2f4a-1c01-7abc-9def-0123456789ab","tsr_timestamp_ns":1706000000001000000}"#,
            signature: "vnD14x9PVxEHXmDBWb6pn1EoYz4s45ys9Ag4tvoYGh4=",
            canonical: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","action_intent":{"action":"dispatch","reason":"queue drained","target":"task://42"},"agent_id":"agent://planner/1","env":"staging","origin":{"kind":"llm_agent","namespace":"ops","source_id":"planner"},"payload":{"plan":["scan","report"],"step":2},"safety":{"digital_signature":"vnD14x9PVxEHXmDBWb6pn1EoYz4s45ys9Ag4tvoYGh4=","hazard_flag":true,"signature_alg":"hmac-sha256","veracity_score":0.75},"schema_version":"1.0.0-draft","tags":["planning","ops"],"trace":{"span_id":"span-2","trace_id":"trace-1"},"tsr_id":"018d2f4a-1c01-7abc-9def-0123456789ab","tsr_timestamp_ns":1706000000001000000}"#,
        },
        GoldenVector {
            name: "prod service with unicode payload",
            key: &[0, 1, 2, 3, 4, 5, 6, 7],
            signable: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"prod","origin":{"kind":"service","source_id":"billing"},"payload":{"city":"Z\u00fcrich","nested":{"a":null,"b":[1,2,3]},"note":"line one\nline two"},"resources":[{"blob_url":"https://blobs.example.org/r/1","content_type":"application/json","sha256_hash":"9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08","size_bytes":512}],"safety":{"hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":0.25},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c02-7fff-bfff-ffffffffffff","tsr_timestamp_ns":0}"#,
            signature: "oah/SCyUb+WnLoFAHQUrrLETN/YsSjFHz9/hNm/LRG4=",
            canonical: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"prod","origin":{"kind":"service","source_id":"billing"},"payload":{"city":"Z\u00fcrich","nested":{"a":null,"b":[1,2,3]},"note":"line one\nline two"},"resources":[{"blob_url":"https://blobs.example.org/r/1","content_type":"application/json","sha256_hash":"9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08","size_bytes":512}],"safety":{"digital_signature":"oah/SCyUb+WnLoFAHQUrrLETN/YsSjFHz9/hNm/LRG4=","hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":0.25},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c02-7fff-bfff-ffffffffffff","tsr_timestamp_ns":0}"#,
        },
        GoldenVector {
            name: "empty key",
            key: b"",
            signable: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"staging","origin":{"kind":"human_operator","source_id":"op-9"},"payload":{},"safety":{"hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":1.0},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c03-7123-a456-789abcdef012","tsr_timestamp_ns":9223372036854775807}"#,
            signature: "qoPfNOwxUIzYhvQ1knb4ILBliF3rDSiDHc1GTNhYkH4=",
            canonical: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"staging","origin":{"kind":"human_operator","source_id":"op-9"},"payload":{},"safety":{"digital_signature":"qoPfNOwxUIzYhvQ1knb4ILBliF3rDSiDHc1GTNhYkH4=","hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":1.0},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c03-7123-a456-789abcdef012","tsr_timestamp_ns":9223372036854775807}"#,
        },
        GoldenVector {
            name: "astral source id and exponent floats",
            key: b"k",
            signable: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"dev","origin":{"kind":"simulator","region":"eu-west","source_id":"sim-\ud83d\udef0"},"payload":{"fixed":1000000000000000.0,"huge":1e+16,"label":"na\u00efve caf\u00e9","ratio":0.0001,"tiny":1e-05},"safety":{"hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":0.9},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c04-7456-8abc-def012345678","tsr_timestamp_ns":1706000000004000000}"#,
            signature: "kmrNzVnZqSatbiPT4oeZurb5uj3e+tDoPFJnhgrS8xw=",
            canonical: r#"{"@context":"https://opentsr.org/context/v1","@type":"OpenTSRSignal","env":"dev","origin":{"kind":"simulator","region":"eu-west","source_id":"sim-\ud83d\udef0"},"payload":{"fixed":1000000000000000.0,"huge":1e+16,"label":"na\u00efve caf\u00e9","ratio":0.0001,"tiny":1e-05},"safety":{"digital_signature":"kmrNzVnZqSatbiPT4oeZurb5uj3e+tDoPFJnhgrS8xw=","hazard_flag":false,"signature_alg":"hmac-sha256","veracity_score":0.9},"schema_version":"1.0.0-draft","tsr_id":"018d2f4a-1c04-7456-8abc-def012345678","tsr_timestamp_ns":1706000000004000000}"#,
        },
    ]
}

/// Parse a vector's canonical form back into a signal.
pub fn signal_from_vector(vector: &GoldenVector) -> Result<Signal, String> {
    let value: Value = serde_json::from_str(vector.canonical)
        .map_err(|e| format!("{}: canonical is not JSON: {e}", vector.name))?;
    Signal::from_value(&value).map_err(|e| format!("{}: {e}", vector.name))
}

/// Check one vector end to end: parse, re-encode, verify, re-sign.
pub fn verify_vector(vector: &GoldenVector) -> Result<(), String> {
    let signal = signal_from_vector(vector)?;

    if signal.canonical_bytes() != vector.canonical.as_bytes() {
        return Err(format!("{}: canonical bytes differ", vector.name));
    }
    if signal.signable_bytes() != vector.signable.as_bytes() {
        return Err(format!("{}: signable bytes differ", vector.name));
    }
    if !signal.verify(vector.key) {
        return Err(format!("{}: signature does not verify", vector.name));
    }

    let mut resigned = signal.clone();
    let signature = resigned
        .sign(vector.key, "hmac-sha256")
        .map_err(|e| format!("{}: {e}", vector.name))?;
    if signature != vector.signature {
        return Err(format!(
            "{}: expected signature {}, got {signature}",
            vector.name, vector.signature
        ));
    }

    let raw = STANDARD
        .decode(signature)
        .map_err(|e| format!("{}: signature is not base64: {e}", vector.name))?;
    if raw.len() != 32 {
        return Err(format!("{}: signature is {} bytes", vector.name, raw.len()));
    }
    Ok(())
}

/// Verify every golden vector, collecting all failures.
pub fn verify_all_vectors() -> Result<(), Vec<String>> {
    let failures: Vec<String> = all_vectors()
        .iter()
        .filter_map(|v| verify_vector(v).err())
        .collect();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}
