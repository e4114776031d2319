//! Step Normalizer - あらゆる形のステップ出力から正規化されたエンティティを取り出す
//!
//! Accepted outer shapes:
//! 1. `{data, meta}` (current envelope)
//! 2. `{data}` without `meta` (legacy nested output)
//! 3. anything else (flat legacy payload)
//!
//! The handoff type comes from `meta.handoff.type` when present. Otherwise it
//! is inferred from the payload shape using [`SHAPE_PRECEDENCE`], a frozen
//! order that must not change.

use serde_json::{Map, Value};

use super::extract::{MESSAGE_KEYS, data_summary, entities_for, is_message_value};
use crate::domain::{AgentId, HANDOFF_VERSION, HandoffType};

/// Payload shapes that identify a handoff type when metadata is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataShape {
    /// `bdr_queue` or `queue` is an array.
    OperationalQueue,
    /// `messages` array/object/string, `messages_pack` array/object, or
    /// `message` string.
    MessagePack,
    /// `hot_leads` is an array.
    HotLeads,
    /// `account` or `account_card` is an object.
    AccountCard,
    /// `leads` is an array.
    Leads,
}

/// Inference order. Earlier entries win when a payload matches several.
pub const SHAPE_PRECEDENCE: [DataShape; 5] = [
    DataShape::OperationalQueue,
    DataShape::MessagePack,
    DataShape::HotLeads,
    DataShape::AccountCard,
    DataShape::Leads,
];

impl DataShape {
    pub fn matches(self, data: &Value) -> bool {
        let Some(obj) = data.as_object() else {
            return false;
        };
        let is_array = |k: &str| obj.get(k).is_some_and(Value::is_array);
        let is_object = |k: &str| obj.get(k).is_some_and(Value::is_object);

        match self {
            DataShape::OperationalQueue => is_array("bdr_queue") || is_array("queue"),
            DataShape::MessagePack => MESSAGE_KEYS
                .iter()
                .any(|k| obj.get(*k).is_some_and(is_message_value)),
            DataShape::HotLeads => is_array("hot_leads"),
            DataShape::AccountCard => is_object("account") || is_object("account_card"),
            DataShape::Leads => is_array("leads"),
        }
    }

    pub fn handoff_type(self) -> HandoffType {
        match self {
            DataShape::OperationalQueue => HandoffType::BdrQueue,
            DataShape::MessagePack => HandoffType::MessagesPack,
            DataShape::HotLeads => HandoffType::HotLeads,
            DataShape::AccountCard => HandoffType::AccountCard,
            DataShape::Leads => HandoffType::LeadsTable,
        }
    }
}

/// First shape in [`SHAPE_PRECEDENCE`] that `data` matches.
pub fn infer_handoff_type(data: &Value) -> Option<HandoffType> {
    SHAPE_PRECEDENCE
        .iter()
        .find(|shape| shape.matches(data))
        .map(|shape| shape.handoff_type())
}

/// The canonical view of one step's output.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStep {
    pub agent_id: AgentId,
    pub handoff_type: Option<HandoffType>,
    pub entities: Map<String, Value>,
    pub data_summary: Value,
    /// Explicit descriptor version, or the current one when derived.
    pub handoff_version: String,
    /// Whether `handoff_type` came from shape inference.
    pub inferred: bool,
    pub compat: Vec<AgentId>,
    /// Non-fatal oddities found while normalizing.
    pub notes: Vec<String>,
}

impl NormalizedStep {
    pub fn is_supported_version(&self) -> bool {
        self.handoff_version == HANDOFF_VERSION
    }

    pub fn accepts(&self, consumer: AgentId) -> bool {
        self.compat.contains(&consumer)
    }

    pub fn entity(&self, key: &str) -> Option<&Value> {
        self.entities.get(key)
    }
}

/// Split any accepted outer shape into `(payload, meta)`.
pub fn split_output(output: &Value) -> (&Value, Option<&Map<String, Value>>) {
    if let Some(obj) = output.as_object() {
        if let Some(data) = obj.get("data") {
            if let Some(meta) = obj.get("meta") {
                return (data, meta.as_object());
            }
            if data.is_object() {
                return (data, None);
            }
        }
    }
    (output, None)
}

/// Normalize a step output produced by `declared` (the agent the goal
/// scheduled). `meta.agent_id` overrides it when it names a known agent.
pub fn normalize_step(declared: AgentId, output: &Value) -> NormalizedStep {
    let (data, meta) = split_output(output);
    let mut notes = Vec::new();

    let agent_id = meta
        .and_then(|m| m.get("agent_id"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<AgentId>().ok())
        .unwrap_or(declared);

    let explicit = meta
        .and_then(|m| m.get("handoff"))
        .and_then(Value::as_object);

    let explicit_type = match explicit.and_then(|h| h.get("type")).and_then(Value::as_str) {
        Some(name) => {
            let parsed = HandoffType::parse(name);
            if parsed.is_none() {
                notes.push(format!("unrecognized handoff type `{name}`"));
            }
            parsed
        }
        None => None,
    };

    let (handoff_type, inferred) = match explicit_type {
        Some(t) => (Some(t), false),
        None => {
            let t = infer_handoff_type(data);
            (t, t.is_some())
        }
    };

    let handoff_version = match (explicit_type, explicit) {
        (Some(_), Some(h)) => h
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(HANDOFF_VERSION)
            .to_string(),
        _ => HANDOFF_VERSION.to_string(),
    };

    let mut entities = match handoff_type {
        Some(t) => explicit_entities(t, explicit).unwrap_or_else(|| entities_for(t, data)),
        None => Map::new(),
    };

    if let Some(leads) = data.get("leads").filter(|v| v.is_array()) {
        entities.insert("leads".into(), leads.clone());
    }

    NormalizedStep {
        agent_id,
        handoff_type,
        entities,
        data_summary: data_summary(data),
        handoff_version,
        inferred,
        compat: handoff_type.map(|t| t.compat().to_vec()).unwrap_or_default(),
        notes,
    }
}

/// Explicit entities are trusted only when the type's primary key is present
/// with the expected kind.
fn explicit_entities(
    handoff_type: HandoffType,
    handoff: Option<&Map<String, Value>>,
) -> Option<Map<String, Value>> {
    let entities = handoff?.get("entities")?.as_object()?;
    let (key, kind) = handoff_type.primary_entity();
    entities
        .get(key)
        .is_some_and(|v| kind.matches(v))
        .then(|| entities.clone())
}
