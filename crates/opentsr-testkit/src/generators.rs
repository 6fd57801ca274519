//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use opentsr_core::{
    ActionIntent, Env, Origin, OriginKind, Safety, Signal, SignalBuilder, TsrId, MAX_ID_UNIX_MS,
};

use crate::fixtures::{spread_vector, unit_vector};

/// Generate a TsrId for an arbitrary in-range millisecond timestamp.
pub fn tsr_id() -> impl Strategy<Value = TsrId> {
    (0i64..MAX_ID_UNIX_MS).prop_map(|ms| TsrId::generate_at(ms).expect("in range"))
}

/// Generate a timestamp in nanoseconds.
pub fn timestamp_ns() -> impl Strategy<Value = u64> {
    0u64..=i64::MAX as u64
}

/// Generate an Env.
pub fn env() -> impl Strategy<Value = Env> {
    prop_oneof![Just(Env::Dev), Just(Env::Staging), Just(Env::Prod)]
}

/// Generate an OriginKind.
pub fn origin_kind() -> impl Strategy<Value = OriginKind> {
    prop_oneof![
        Just(OriginKind::LlmAgent),
        Just(OriginKind::Sensor),
        Just(OriginKind::Service),
        Just(OriginKind::HumanOperator),
        Just(OriginKind::Simulator),
    ]
}

/// Generate a non-empty identifier-like string.
pub fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a scalar JSON value.
pub fn json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "\\PC{0,24}".prop_map(Value::from),
    ]
}

/// Generate a payload object.
///
/// Keys never collide with the `blob_url`/`sha256_hash` convention.
pub fn payload() -> impl Strategy<Value = Map<String, Value>> {
    let leaf = json_scalar();
    let value = leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    });
    prop::collection::btree_map("[a-z]{1,10}", value, 0..6).prop_map(|m| m.into_iter().collect())
}

/// Generate an optional normalized vector.
pub fn vector() -> impl Strategy<Value = Option<Vec<f64>>> {
    prop_oneof![
        2 => Just(None),
        1 => prop_oneof![Just(1024usize), Just(1536usize)].prop_map(|d| Some(unit_vector(d))),
        1 => prop_oneof![Just(1024usize), Just(1536usize)].prop_map(|d| Some(spread_vector(d))),
    ]
}

/// Parameters for generating a valid signal.
#[derive(Debug, Clone)]
pub struct SignalParams {
    pub id: TsrId,
    pub timestamp_ns: u64,
    pub env: Env,
    pub kind: OriginKind,
    pub source_id: String,
    pub payload: Map<String, Value>,
    pub veracity_score: f64,
    pub hazard_flag: bool,
    pub tags: Vec<String>,
    pub vector: Option<Vec<f64>>,
}

impl Arbitrary for SignalParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            tsr_id(),
            timestamp_ns(),
            env(),
            origin_kind(),
            ident(),
            payload(),
            0.0f64..=1.0f64,
            any::<bool>(),
            prop::collection::btree_set(ident(), 0..8),
            vector(),
        )
            .prop_map(
                |(id, ts, env, kind, source_id, payload, score, hazard, tags, vector)| {
                    SignalParams {
                        id,
                        timestamp_ns: ts,
                        env,
                        kind,
                        source_id,
                        payload,
                        veracity_score: score,
                        hazard_flag: hazard,
                        tags: tags.into_iter().collect(),
                        vector,
                    }
                },
            )
            .boxed()
    }
}

/// Build a signal from parameters; `prod` signals are signed with `key`.
pub fn signal_from_params(params: &SignalParams, key: &[u8]) -> Signal {
    let mut builder = SignalBuilder::new(
        Origin::new(params.kind, params.source_id.clone()),
        Value::Object(params.payload.clone()),
        Safety::new(params.veracity_score).with_hazard(params.hazard_flag),
    )
    .id(params.id)
    .timestamp_ns(params.timestamp_ns)
    .env(params.env);

    if params.kind == OriginKind::LlmAgent {
        builder = builder
            .agent_id(format!("agent://{}", params.source_id))
            .action_intent(ActionIntent::new("act", "target://generated"));
    }
    for tag in &params.tags {
        builder = builder.tag(tag.clone());
    }
    if let Some(vector) = &params.vector {
        builder = builder.vector(vector.clone());
    }

    match params.env {
        Env::Prod => builder
            .build_signed(key, "hmac-sha256")
            .expect("generated prod signal is valid"),
        _ => builder.build().expect("generated signal is valid"),
    }
}
