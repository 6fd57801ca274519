//! Typed construction of signals.

use serde_json::{Map, Value};

use crate::error::{CoreError, InvariantViolation};
use crate::signal::{keys, ActionIntent, Env, Origin, ResourceRef, Safety, Signal, Trace};
use crate::types::TsrId;
use crate::validation::{check_cross_field, parse_fields, validate_signal};

/// Builder for [`Signal`].
///
/// Field values are assembled into the wire form and run through the same
/// validator as [`Signal::from_value`].
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    id: Option<TsrId>,
    timestamp_ns: Option<u64>,
    env: Env,
    origin: Origin,
    payload: Value,
    safety: Safety,
    agent_id: Option<String>,
    action_intent: Option<ActionIntent>,
    vector: Option<Vec<f64>>,
    tags: Vec<String>,
    trace: Option<Trace>,
    resources: Vec<ResourceRef>,
}

impl SignalBuilder {
    /// Start building a signal from its required fields.
    pub fn new(origin: Origin, payload: Value, safety: Safety) -> Self {
        Self {
            id: None,
            timestamp_ns: None,
            env: Env::Dev,
            origin,
            payload,
            safety,
            agent_id: None,
            action_intent: None,
            vector: None,
            tags: Vec::new(),
            trace: None,
            resources: Vec::new(),
        }
    }

    /// Use a fixed identifier instead of generating one.
    pub fn id(mut self, id: TsrId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the timestamp in unix nanoseconds.
    pub fn timestamp_ns(mut self, ts: u64) -> Self {
        self.timestamp_ns = Some(ts);
        self
    }

    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn action_intent(mut self, intent: ActionIntent) -> Self {
        self.action_intent = Some(intent);
        self
    }

    /// Attach an embedding vector. It must already be L2-normalized.
    pub fn vector(mut self, vector: Vec<f64>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Add a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Add a resource reference.
    pub fn resource(mut self, resource: ResourceRef) -> Self {
        self.resources.push(resource);
        self
    }

    /// Validate and construct the signal.
    pub fn build(self) -> Result<Signal, InvariantViolation> {
        validate_signal(&self.to_value())
    }

    /// Validate, sign, then apply the cross-field rules.
    ///
    /// Signing happens before the cross-field phase, so a `prod` signal can
    /// be built in one step.
    pub fn build_signed(self, key: &[u8], alg: &str) -> Result<Signal, CoreError> {
        let mut signal = parse_fields(&self.to_value())?;
        signal.sign(key, alg)?;
        check_cross_field(&signal)?;
        Ok(signal)
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(id) = self.id {
            map.insert(keys::ID.into(), Value::from(id.to_string()));
        }
        if let Some(ts) = self.timestamp_ns {
            map.insert(keys::TIMESTAMP.into(), Value::from(ts));
        }
        map.insert(keys::ENV.into(), Value::from(self.env.as_str()));
        map.insert(keys::ORIGIN.into(), self.origin.to_value());
        map.insert(keys::PAYLOAD.into(), self.payload.clone());
        map.insert(keys::SAFETY.into(), self.safety.to_value());
        if let Some(agent_id) = &self.agent_id {
            map.insert(keys::AGENT_ID.into(), Value::from(agent_id.as_str()));
        }
        if let Some(intent) = &self.action_intent {
            map.insert(keys::ACTION_INTENT.into(), intent.to_value());
        }
        if let Some(vector) = &self.vector {
            map.insert(
                keys::VECTOR.into(),
                Value::Array(vector.iter().map(|c| Value::from(*c)).collect()),
            );
        }
        if !self.tags.is_empty() {
            map.insert(
                keys::TAGS.into(),
                Value::Array(self.tags.iter().map(|t| Value::from(t.as_str())).collect()),
            );
        }
        if let Some(trace) = &self.trace {
            map.insert(keys::TRACE.into(), trace.to_value());
        }
        if !self.resources.is_empty() {
            map.insert(
                keys::RESOURCES.into(),
                Value::Array(self.resources.iter().map(ResourceRef::to_value).collect()),
            );
        }
        Value::Object(map)
    }
}
