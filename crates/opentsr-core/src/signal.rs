//! Signal: the trust/telemetry signal record (TSR).
//!
//! A signal is immutable once constructed. The only sanctioned mutation is
//! signing, which sets `safety.digital_signature` and `safety.signature_alg`
//! together (see [`crate::crypto`]).

use serde_json::{Map, Value};
use std::fmt;

use crate::canonical::canonical_json_bytes;
use crate::error::InvariantViolation;
use crate::types::TsrId;
use crate::validation::validate_signal;

/// Default `@context` value.
pub const TSR_CONTEXT: &str = "https://opentsr.org/context/v1";

/// Default `@type` value.
pub const TSR_TYPE: &str = "OpenTSRSignal";

/// The only supported `schema_version`.
pub const SCHEMA_VERSION: &str = "1.0.0-draft";

/// Payloads above this canonical size produce a warning.
pub const MAX_PAYLOAD_SOFT_BYTES: usize = 1024 * 1024;

/// Payloads above this canonical size are rejected.
pub const MAX_PAYLOAD_HARD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted embedding dimensions.
pub const VECTOR_DIMS: [usize; 2] = [1024, 1536];

/// Allowed distance of a vector's L2 norm from 1.0.
pub const NORM_TOLERANCE: f64 = 1e-3;

/// Maximum number of tags.
pub const MAX_TAGS: usize = 64;

/// Wire keys.
pub(crate) mod keys {
    pub const CONTEXT: &str = "@context";
    pub const TYPE: &str = "@type";
    pub const SCHEMA_VERSION: &str = "schema_version";
    pub const ID: &str = "tsr_id";
    pub const TIMESTAMP: &str = "tsr_timestamp_ns";
    pub const ENV: &str = "env";
    pub const ORIGIN: &str = "origin";
    pub const PAYLOAD: &str = "payload";
    pub const SAFETY: &str = "safety";
    pub const AGENT_ID: &str = "agent_id";
    pub const ACTION_INTENT: &str = "action_intent";
    pub const VECTOR: &str = "vector";
    pub const TAGS: &str = "tags";
    pub const TRACE: &str = "trace";
    pub const RESOURCES: &str = "resources";

    pub const ALL: [&str; 15] = [
        CONTEXT,
        TYPE,
        SCHEMA_VERSION,
        ID,
        TIMESTAMP,
        ENV,
        ORIGIN,
        PAYLOAD,
        SAFETY,
        AGENT_ID,
        ACTION_INTENT,
        VECTOR,
        TAGS,
        TRACE,
        RESOURCES,
    ];

    pub const DIGITAL_SIGNATURE: &str = "digital_signature";
    pub const SIGNATURE_ALG: &str = "signature_alg";
}

/// Deployment environment of the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Env {
    Dev,
    Staging,
    Prod,
}

impl Env {
    pub const ALL: [Env; 3] = [Env::Dev, Env::Staging, Env::Prod];

    pub fn as_str(self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Staging => "staging",
            Env::Prod => "prod",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.as_str() == s)
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of emitter produced the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginKind {
    LlmAgent,
    Sensor,
    Service,
    HumanOperator,
    Simulator,
}

impl OriginKind {
    pub const ALL: [OriginKind; 5] = [
        OriginKind::LlmAgent,
        OriginKind::Sensor,
        OriginKind::Service,
        OriginKind::HumanOperator,
        OriginKind::Simulator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OriginKind::LlmAgent => "llm_agent",
            OriginKind::Sensor => "sensor",
            OriginKind::Service => "service",
            OriginKind::HumanOperator => "human_operator",
            OriginKind::Simulator => "simulator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub kind: OriginKind,
    pub source_id: String,
    pub namespace: Option<String>,
    pub device_id: Option<String>,
    pub software_version: Option<String>,
    pub region: Option<String>,
}

impl Origin {
    pub fn new(kind: OriginKind, source_id: impl Into<String>) -> Self {
        Self {
            kind,
            source_id: source_id.into(),
            namespace: None,
            device_id: None,
            software_version: None,
            region: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_software_version(mut self, version: impl Into<String>) -> Self {
        self.software_version = Some(version.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("kind".into(), Value::from(self.kind.as_str()));
        map.insert("source_id".into(), Value::from(self.source_id.as_str()));
        insert_opt(&mut map, "namespace", &self.namespace);
        insert_opt(&mut map, "device_id", &self.device_id);
        insert_opt(&mut map, "software_version", &self.software_version);
        insert_opt(&mut map, "region", &self.region);
        Value::Object(map)
    }
}

/// Safety metadata. The signature pair is either fully present or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Safety {
    pub veracity_score: f64,
    pub hazard_flag: bool,
    pub digital_signature: Option<String>,
    pub signature_alg: Option<String>,
}

impl Safety {
    pub fn new(veracity_score: f64) -> Self {
        Self {
            veracity_score,
            hazard_flag: false,
            digital_signature: None,
            signature_alg: None,
        }
    }

    pub fn with_hazard(mut self, hazard_flag: bool) -> Self {
        self.hazard_flag = hazard_flag;
        self
    }

    /// Attach a precomputed signature pair.
    pub fn with_signature(mut self, signature: impl Into<String>, alg: impl Into<String>) -> Self {
        self.digital_signature = Some(signature.into());
        self.signature_alg = Some(alg.into());
        self
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("veracity_score".into(), Value::from(self.veracity_score));
        map.insert("hazard_flag".into(), Value::Bool(self.hazard_flag));
        insert_opt(&mut map, keys::DIGITAL_SIGNATURE, &self.digital_signature);
        insert_opt(&mut map, keys::SIGNATURE_ALG, &self.signature_alg);
        Value::Object(map)
    }
}

/// The action an agent intends to take. Required for `llm_agent` origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionIntent {
    pub action: String,
    pub target: String,
    pub reason: Option<String>,
    pub requested_by: Option<String>,
}

impl ActionIntent {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            reason: None,
            requested_by: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("action".into(), Value::from(self.action.as_str()));
        map.insert("target".into(), Value::from(self.target.as_str()));
        insert_opt(&mut map, "reason", &self.reason);
        insert_opt(&mut map, "requested_by", &self.requested_by);
        Value::Object(map)
    }
}

/// Distributed tracing correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
}

impl Trace {
    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        insert_opt(&mut map, "trace_id", &self.trace_id);
        insert_opt(&mut map, "span_id", &self.span_id);
        insert_opt(&mut map, "parent_span_id", &self.parent_span_id);
        Value::Object(map)
    }
}

/// A reference to an external blob, pinned by its SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub blob_url: String,
    pub sha256_hash: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<u64>,
}

impl ResourceRef {
    pub fn new(blob_url: impl Into<String>, sha256_hash: impl Into<String>) -> Self {
        Self {
            blob_url: blob_url.into(),
            sha256_hash: sha256_hash.into(),
            content_type: None,
            size_bytes: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("blob_url".into(), Value::from(self.blob_url.as_str()));
        map.insert("sha256_hash".into(), Value::from(self.sha256_hash.as_str()));
        insert_opt(&mut map, "content_type", &self.content_type);
        if let Some(size) = self.size_bytes {
            map.insert("size_bytes".into(), Value::from(size));
        }
        Value::Object(map)
    }
}

/// Non-fatal findings produced while constructing a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    PayloadAboveSoftLimit { bytes: usize },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::PayloadAboveSoftLimit { bytes } => {
                write!(f, "payload exceeds 1MB soft limit ({bytes} bytes)")
            }
        }
    }
}

/// A fully validated signal.
///
/// Obtain one through [`Signal::from_value`] or
/// [`SignalBuilder`](crate::builder::SignalBuilder); there is no way to
/// observe a signal that has not passed every invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub(crate) id: TsrId,
    pub(crate) timestamp_ns: u64,
    pub(crate) env: Env,
    pub(crate) origin: Origin,
    pub(crate) payload: Map<String, Value>,
    pub(crate) payload_bytes: usize,
    pub(crate) safety: Safety,
    pub(crate) agent_id: Option<String>,
    pub(crate) action_intent: Option<ActionIntent>,
    pub(crate) vector: Option<Vec<f64>>,
    pub(crate) tags: Option<Vec<String>>,
    pub(crate) trace: Option<Trace>,
    pub(crate) resources: Option<Vec<ResourceRef>>,
}

impl Signal {
    /// Validate a raw JSON object and construct a signal from it.
    ///
    /// Per-field checks run in declaration order, then cross-field rules.
    /// The first violation is returned.
    pub fn from_value(value: &Value) -> Result<Self, InvariantViolation> {
        validate_signal(value)
    }

    pub fn context(&self) -> &'static str {
        TSR_CONTEXT
    }

    pub fn signal_type(&self) -> &'static str {
        TSR_TYPE
    }

    pub fn schema_version(&self) -> &'static str {
        SCHEMA_VERSION
    }

    pub fn id(&self) -> TsrId {
        self.id
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn env(&self) -> Env {
        self.env
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Canonical size of the payload in bytes.
    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }

    pub fn safety(&self) -> &Safety {
        &self.safety
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn action_intent(&self) -> Option<&ActionIntent> {
        self.action_intent.as_ref()
    }

    pub fn vector(&self) -> Option<&[f64]> {
        self.vector.as_deref()
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn resources(&self) -> Option<&[ResourceRef]> {
        self.resources.as_deref()
    }

    /// Whether a signature pair is attached.
    pub fn is_signed(&self) -> bool {
        self.safety.digital_signature.is_some()
    }

    /// Non-fatal findings for this signal.
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if self.payload_bytes > MAX_PAYLOAD_SOFT_BYTES {
            warnings.push(ValidationWarning::PayloadAboveSoftLimit {
                bytes: self.payload_bytes,
            });
        }
        warnings
    }

    /// The wire form: unset optional fields are omitted.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(keys::CONTEXT.into(), Value::from(TSR_CONTEXT));
        map.insert(keys::TYPE.into(), Value::from(TSR_TYPE));
        map.insert(keys::SCHEMA_VERSION.into(), Value::from(SCHEMA_VERSION));
        map.insert(keys::ID.into(), Value::from(self.id.to_string()));
        map.insert(keys::TIMESTAMP.into(), Value::from(self.timestamp_ns));
        map.insert(keys::ENV.into(), Value::from(self.env.as_str()));
        map.insert(keys::ORIGIN.into(), self.origin.to_value());
        map.insert(keys::PAYLOAD.into(), Value::Object(self.payload.clone()));
        map.insert(keys::SAFETY.into(), self.safety.to_value());
        insert_opt(&mut map, keys::AGENT_ID, &self.agent_id);
        if let Some(intent) = &self.action_intent {
            map.insert(keys::ACTION_INTENT.into(), intent.to_value());
        }
        if let Some(vector) = &self.vector {
            map.insert(
                keys::VECTOR.into(),
                Value::Array(vector.iter().map(|c| Value::from(*c)).collect()),
            );
        }
        if let Some(tags) = &self.tags {
            map.insert(
                keys::TAGS.into(),
                Value::Array(tags.iter().map(|t| Value::from(t.as_str())).collect()),
            );
        }
        if let Some(trace) = &self.trace {
            map.insert(keys::TRACE.into(), trace.to_value());
        }
        if let Some(resources) = &self.resources {
            map.insert(
                keys::RESOURCES.into(),
                Value::Array(resources.iter().map(ResourceRef::to_value).collect()),
            );
        }
        Value::Object(map)
    }

    /// Canonical JSON bytes of the wire form.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_json_bytes(&self.to_value())
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::from(v.as_str()));
    }
}
