//! Signal validation: per-field structural checks, then cross-field rules.
//!
//! Fields are read in declaration order and every check fails fast, so the
//! reported [`InvariantViolation`] is always the first one encountered.
//! Objects are closed: unknown keys are rejected everywhere except inside
//! the opaque `payload`.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::canonical::canonical_len;
use crate::error::InvariantViolation;
use crate::signal::{
    keys, ActionIntent, Env, Origin, OriginKind, ResourceRef, Safety, Signal, Trace,
    MAX_PAYLOAD_HARD_BYTES, MAX_TAGS, NORM_TOLERANCE, SCHEMA_VERSION, TSR_CONTEXT, TSR_TYPE,
    VECTOR_DIMS,
};
use crate::types::{now_timestamp_ns, TsrId, MAX_TIMESTAMP_NS};

type Check<T> = Result<T, InvariantViolation>;

/// Validate a raw JSON value and construct a [`Signal`].
pub fn validate_signal(value: &Value) -> Check<Signal> {
    let signal = parse_fields(value)?;
    check_cross_field(&signal)?;

    for warning in signal.warnings() {
        tracing::warn!(tsr_id = %signal.id, %warning, "signal constructed with warning");
    }
    Ok(signal)
}

/// Phase 1: structural and range checks for each field.
///
/// The result has not been through [`check_cross_field`] and must not
/// escape the crate.
pub(crate) fn parse_fields(value: &Value) -> Check<Signal> {
    let map = object(value, "<root>")?;
    reject_unknown(map, &keys::ALL, "")?;

    fixed_string(map, keys::CONTEXT, TSR_CONTEXT)?;
    fixed_string(map, keys::TYPE, TSR_TYPE)?;
    fixed_string(map, keys::SCHEMA_VERSION, SCHEMA_VERSION)?;

    let id = match map.get(keys::ID) {
        None => TsrId::generate().map_err(|e| InvariantViolation::new(keys::ID, e.to_string()))?,
        Some(Value::String(s)) => {
            TsrId::parse(s).map_err(|e| InvariantViolation::new(keys::ID, e.to_string()))?
        }
        Some(_) => return Err(InvariantViolation::new(keys::ID, "must be a string")),
    };

    let timestamp_ns = match map.get(keys::TIMESTAMP) {
        None => now_timestamp_ns(),
        Some(v) => timestamp(v)?,
    };

    let env = match map.get(keys::ENV) {
        None => Env::Dev,
        Some(Value::String(s)) => Env::parse(s).ok_or_else(|| {
            InvariantViolation::new(keys::ENV, "must be one of dev, staging, prod")
        })?,
        Some(_) => return Err(InvariantViolation::new(keys::ENV, "must be a string")),
    };

    let origin = parse_origin(required(map, keys::ORIGIN, "")?)?;

    let payload_value = required(map, keys::PAYLOAD, "")?;
    let payload = object(payload_value, keys::PAYLOAD)?.clone();
    let payload_bytes = canonical_len(payload_value);
    check_payload(&payload, payload_bytes)?;

    let safety = parse_safety(required(map, keys::SAFETY, "")?)?;

    let agent_id = optional_string(map, keys::AGENT_ID, "")?;

    let action_intent = present(map, keys::ACTION_INTENT)
        .map(parse_action_intent)
        .transpose()?;

    let vector = present(map, keys::VECTOR).map(parse_vector).transpose()?;
    let tags = present(map, keys::TAGS).map(parse_tags).transpose()?;
    let trace = present(map, keys::TRACE).map(parse_trace).transpose()?;
    let resources = present(map, keys::RESOURCES)
        .map(parse_resources)
        .transpose()?;

    Ok(Signal {
        id,
        timestamp_ns,
        env,
        origin,
        payload,
        payload_bytes,
        safety,
        agent_id,
        action_intent,
        vector,
        tags,
        trace,
        resources,
    })
}

/// Phase 2: rules that relate several fields.
pub(crate) fn check_cross_field(signal: &Signal) -> Check<()> {
    if signal.origin.kind == OriginKind::LlmAgent {
        if signal.agent_id.is_none() {
            return Err(InvariantViolation::new(
                keys::AGENT_ID,
                "is required when origin.kind is llm_agent",
            ));
        }
        if signal.action_intent.is_none() {
            return Err(InvariantViolation::new(
                keys::ACTION_INTENT,
                "is required when origin.kind is llm_agent",
            ));
        }
    }

    let safety = &signal.safety;
    if signal.env == Env::Prod && safety.digital_signature.is_none() {
        return Err(InvariantViolation::new(
            "safety.digital_signature",
            "is required when env is prod",
        ));
    }
    match (&safety.digital_signature, &safety.signature_alg) {
        (Some(_), None) => Err(InvariantViolation::new(
            "safety.signature_alg",
            "is required when safety.digital_signature is present",
        )),
        (None, Some(_)) => Err(InvariantViolation::new(
            "safety.digital_signature",
            "is required when safety.signature_alg is present",
        )),
        _ => Ok(()),
    }
}

/// Whether `s` is a 64-character hex digest (either case).
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && hex::decode(s).is_ok()
}

fn parse_origin(value: &Value) -> Check<Origin> {
    let map = object(value, keys::ORIGIN)?;
    reject_unknown(
        map,
        &["kind", "source_id", "namespace", "device_id", "software_version", "region"],
        keys::ORIGIN,
    )?;

    let kind = match required(map, "kind", keys::ORIGIN)? {
        Value::String(s) => OriginKind::parse(s).ok_or_else(|| {
            InvariantViolation::new(
                "origin.kind",
                "must be one of llm_agent, sensor, service, human_operator, simulator",
            )
        })?,
        _ => return Err(InvariantViolation::new("origin.kind", "must be a string")),
    };

    Ok(Origin {
        kind,
        source_id: required_string(map, "source_id", keys::ORIGIN)?,
        namespace: optional_string(map, "namespace", keys::ORIGIN)?,
        device_id: optional_string(map, "device_id", keys::ORIGIN)?,
        software_version: optional_string(map, "software_version", keys::ORIGIN)?,
        region: optional_string(map, "region", keys::ORIGIN)?,
    })
}

fn check_payload(payload: &Map<String, Value>, payload_bytes: usize) -> Check<()> {
    if payload_bytes > MAX_PAYLOAD_HARD_BYTES {
        return Err(InvariantViolation::new(
            keys::PAYLOAD,
            format!("payload exceeds 5MB hard limit ({payload_bytes} bytes)"),
        ));
    }

    if payload.contains_key("blob_url") && present(payload, "sha256_hash").is_none() {
        return Err(InvariantViolation::new(
            "payload.sha256_hash",
            "is required when payload.blob_url is set",
        ));
    }

    match present(payload, "sha256_hash") {
        None => Ok(()),
        Some(Value::String(s)) if is_sha256_hex(s) => Ok(()),
        Some(_) => Err(InvariantViolation::new(
            "payload.sha256_hash",
            "must be a 64-character hex digest",
        )),
    }
}

fn parse_safety(value: &Value) -> Check<Safety> {
    let map = object(value, keys::SAFETY)?;
    reject_unknown(
        map,
        &["veracity_score", "hazard_flag", keys::DIGITAL_SIGNATURE, keys::SIGNATURE_ALG],
        keys::SAFETY,
    )?;

    let veracity_score = match required(map, "veracity_score", keys::SAFETY)? {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => {
            return Err(InvariantViolation::new(
                "safety.veracity_score",
                "must be a number",
            ))
        }
    };
    if !(0.0..=1.0).contains(&veracity_score) {
        return Err(InvariantViolation::new(
            "safety.veracity_score",
            "must be between 0.0 and 1.0",
        ));
    }

    let hazard_flag = match map.get("hazard_flag") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(InvariantViolation::new(
                "safety.hazard_flag",
                "must be a boolean",
            ))
        }
    };

    Ok(Safety {
        veracity_score,
        hazard_flag,
        digital_signature: optional_string(map, keys::DIGITAL_SIGNATURE, keys::SAFETY)?,
        signature_alg: optional_string(map, keys::SIGNATURE_ALG, keys::SAFETY)?,
    })
}

fn parse_action_intent(value: &Value) -> Check<ActionIntent> {
    let map = object(value, keys::ACTION_INTENT)?;
    reject_unknown(
        map,
        &["action", "target", "reason", "requested_by"],
        keys::ACTION_INTENT,
    )?;

    Ok(ActionIntent {
        action: required_string(map, "action", keys::ACTION_INTENT)?,
        target: required_string(map, "target", keys::ACTION_INTENT)?,
        reason: optional_string(map, "reason", keys::ACTION_INTENT)?,
        requested_by: optional_string(map, "requested_by", keys::ACTION_INTENT)?,
    })
}

fn parse_vector(value: &Value) -> Check<Vec<f64>> {
    let items = array(value, keys::VECTOR)?;

    let mut vector = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item.as_f64() {
            Some(component) => vector.push(component),
            None => {
                return Err(InvariantViolation::new(
                    format!("vector[{i}]"),
                    "must be a number",
                ))
            }
        }
    }

    if !VECTOR_DIMS.contains(&vector.len()) {
        return Err(InvariantViolation::new(
            keys::VECTOR,
            format!("length must be exactly 1024 or 1536, got {}", vector.len()),
        ));
    }

    let norm = vector.iter().map(|c| c * c).sum::<f64>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(InvariantViolation::new(
            keys::VECTOR,
            "norm must be finite and non-zero",
        ));
    }
    if (norm - 1.0).abs() > NORM_TOLERANCE {
        return Err(InvariantViolation::new(
            keys::VECTOR,
            format!("must be L2-normalized (norm ~= 1.0), got {norm}"),
        ));
    }

    Ok(vector)
}

fn parse_tags(value: &Value) -> Check<Vec<String>> {
    let items = array(value, keys::TAGS)?;
    if items.len() > MAX_TAGS {
        return Err(InvariantViolation::new(
            keys::TAGS,
            format!("must contain at most {MAX_TAGS} values"),
        ));
    }

    let mut seen = HashSet::with_capacity(items.len());
    let mut tags = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("tags[{i}]");
        let tag = match item {
            Value::String(s) if s.is_empty() => {
                return Err(InvariantViolation::new(path, "must be non-empty"))
            }
            Value::String(s) => s,
            _ => return Err(InvariantViolation::new(path, "must be a string")),
        };
        if !seen.insert(tag.as_str()) {
            return Err(InvariantViolation::new(
                path,
                format!("duplicate tag '{tag}'"),
            ));
        }
        tags.push(tag.clone());
    }
    Ok(tags)
}

fn parse_trace(value: &Value) -> Check<Trace> {
    let map = object(value, keys::TRACE)?;
    reject_unknown(map, &["trace_id", "span_id", "parent_span_id"], keys::TRACE)?;

    Ok(Trace {
        trace_id: optional_string(map, "trace_id", keys::TRACE)?,
        span_id: optional_string(map, "span_id", keys::TRACE)?,
        parent_span_id: optional_string(map, "parent_span_id", keys::TRACE)?,
    })
}

fn parse_resources(value: &Value) -> Check<Vec<ResourceRef>> {
    let items = array(value, keys::RESOURCES)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_resource(item, &format!("resources[{i}]")))
        .collect()
}

fn parse_resource(value: &Value, path: &str) -> Check<ResourceRef> {
    let map = object(value, path)?;
    reject_unknown(
        map,
        &["blob_url", "sha256_hash", "content_type", "size_bytes"],
        path,
    )?;

    let blob_url = required_string(map, "blob_url", path)?;
    let sha256_hash = required_string(map, "sha256_hash", path)?;
    if !is_sha256_hex(&sha256_hash) {
        return Err(InvariantViolation::new(
            join(path, "sha256_hash"),
            "must be a 64-character hex digest",
        ));
    }
    let content_type = optional_string(map, "content_type", path)?;

    let size_bytes = match present(map, "size_bytes") {
        None => None,
        Some(Value::Number(n)) if n.is_u64() => n.as_u64(),
        Some(Value::Number(n)) if n.is_i64() => {
            return Err(InvariantViolation::new(join(path, "size_bytes"), "must be >= 0"))
        }
        Some(_) => {
            return Err(InvariantViolation::new(
                join(path, "size_bytes"),
                "must be an integer",
            ))
        }
    };

    Ok(ResourceRef {
        blob_url,
        sha256_hash,
        content_type,
        size_bytes,
    })
}

fn timestamp(value: &Value) -> Check<u64> {
    let n = match value {
        Value::Number(n) => n,
        _ => return Err(InvariantViolation::new(keys::TIMESTAMP, "must be an integer")),
    };
    if let Some(ts) = n.as_u64() {
        if ts > MAX_TIMESTAMP_NS {
            return Err(InvariantViolation::new(
                keys::TIMESTAMP,
                format!("must be <= {MAX_TIMESTAMP_NS}"),
            ));
        }
        return Ok(ts);
    }
    if n.is_i64() {
        return Err(InvariantViolation::new(keys::TIMESTAMP, "must be >= 0"));
    }
    Err(InvariantViolation::new(keys::TIMESTAMP, "must be an integer"))
}

fn fixed_string(map: &Map<String, Value>, key: &str, expected: &str) -> Check<()> {
    match map.get(key) {
        None => Ok(()),
        Some(Value::String(s)) if s == expected => Ok(()),
        Some(Value::String(_)) => Err(InvariantViolation::new(
            key,
            format!("must be \"{expected}\""),
        )),
        Some(_) => Err(InvariantViolation::new(key, "must be a string")),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Field access helpers
// ─────────────────────────────────────────────────────────────────────────

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// A key that is present and not `null`.
///
/// Only optional fields treat `null` as absent; defaulted fields read the
/// map directly so an explicit `null` is a type error.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn required<'a>(map: &'a Map<String, Value>, key: &str, prefix: &str) -> Check<&'a Value> {
    present(map, key).ok_or_else(|| InvariantViolation::new(join(prefix, key), "is required"))
}

fn object<'a>(value: &'a Value, path: &str) -> Check<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| InvariantViolation::new(path, "must be an object"))
}

fn array<'a>(value: &'a Value, path: &str) -> Check<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| InvariantViolation::new(path, "must be an array"))
}

fn required_string(map: &Map<String, Value>, key: &str, prefix: &str) -> Check<String> {
    match required(map, key, prefix)? {
        Value::String(s) if s.is_empty() => {
            Err(InvariantViolation::new(join(prefix, key), "must be non-empty"))
        }
        Value::String(s) => Ok(s.clone()),
        _ => Err(InvariantViolation::new(join(prefix, key), "must be a string")),
    }
}

fn optional_string(map: &Map<String, Value>, key: &str, prefix: &str) -> Check<Option<String>> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => {
            Err(InvariantViolation::new(join(prefix, key), "must be non-empty"))
        }
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(InvariantViolation::new(join(prefix, key), "must be a string")),
    }
}

/// Reject the smallest key not in `allowed`, so the report is deterministic.
fn reject_unknown(map: &Map<String, Value>, allowed: &[&str], prefix: &str) -> Check<()> {
    match map.keys().filter(|k| !allowed.contains(&k.as_str())).min() {
        Some(unknown) => Err(InvariantViolation::new(
            join(prefix, unknown),
            "unknown field",
        )),
        None => Ok(()),
    }
}
