//! Entity extraction and payload projections.
//!
//! One rule per output family. Every rule degrades gracefully: an absent
//! source field becomes an empty value of the expected kind, so a partial
//! payload still projects to a well-typed entity set.

use serde_json::{Map, Value, json};

use crate::domain::HandoffType;

/// Canonical entities of `handoff_type` projected out of `data`.
pub fn entities_for(handoff_type: HandoffType, data: &Value) -> Map<String, Value> {
    match handoff_type {
        HandoffType::LeadsTable => list_of_leads("leads", data),
        HandoffType::HotLeads => list_of_leads("hot_leads", data),
        HandoffType::AccountCard => single_account(data),
        HandoffType::MessagesPack => message_sequence(data),
        HandoffType::BdrQueue => operational_queue(data),
        HandoffType::ContentPack => freeform_content(data),
        HandoffType::BoardReview => board_verdict(data),
    }
}

fn list_of_leads(key: &str, data: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(key.to_string(), array_at(data, key).unwrap_or_else(empty_array));
    out
}

fn single_account(data: &Value) -> Map<String, Value> {
    let account = object_at(data, "account")
        .or_else(|| object_at(data, "account_card"))
        .unwrap_or_else(|| Value::Object(Map::new()));
    let contacts = array_at(&account, "contacts")
        .or_else(|| array_at(data, "contacts"))
        .unwrap_or_else(empty_array);

    let mut out = Map::new();
    out.insert("account".into(), account);
    out.insert("contacts".into(), contacts);
    out
}

/// Keys a message pack may arrive under, in lookup order.
pub(crate) const MESSAGE_KEYS: [&str; 3] = ["messages", "messages_pack", "message"];

fn message_sequence(data: &Value) -> Map<String, Value> {
    let messages = MESSAGE_KEYS
        .iter()
        .find_map(|key| data.get(*key).and_then(as_message_list))
        .unwrap_or_default();

    let mut out = Map::new();
    out.insert("messages".into(), Value::Array(messages));
    out
}

/// Whether `value` can stand for a message pack. Shape inference and
/// extraction share this so they never disagree.
pub(crate) fn is_message_value(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_) | Value::String(_))
}

/// Arrays pass through, a lone object becomes a one-element list and a bare
/// string becomes a single dm.
fn as_message_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(_) => Some(vec![value.clone()]),
        Value::String(text) => Some(vec![json!({"channel": "dm", "text": text})]),
        _ => None,
    }
}

fn operational_queue(data: &Value) -> Map<String, Value> {
    let queue = array_at(data, "bdr_queue")
        .or_else(|| array_at(data, "queue"))
        .unwrap_or_else(empty_array);
    let mut out = Map::new();
    out.insert("queue".into(), queue);
    out
}

fn freeform_content(data: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(
        "pieces".into(),
        array_at(data, "pieces").unwrap_or_else(empty_array),
    );
    out.insert(
        "summary".into(),
        data.get("summary")
            .filter(|v| v.is_string())
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    out
}

fn board_verdict(data: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(
        "verdict".into(),
        data.get("verdict")
            .filter(|v| v.is_string())
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    out.insert(
        "concerns".into(),
        array_at(data, "concerns").unwrap_or_else(empty_array),
    );
    out.insert(
        "score".into(),
        data.get("score")
            .filter(|v| v.is_number())
            .cloned()
            .unwrap_or(Value::Null),
    );
    out
}

fn array_at(data: &Value, key: &str) -> Option<Value> {
    data.get(key).filter(|v| v.is_array()).cloned()
}

fn object_at(data: &Value, key: &str) -> Option<Value> {
    data.get(key).filter(|v| v.is_object()).cloned()
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

/// Shallow diagnostic view: arrays become their length, objects their key
/// count, scalars pass through.
pub fn data_summary(data: &Value) -> Value {
    match data {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), summarize_value(v)))
                .collect(),
        ),
        other => summarize_value(other),
    }
}

fn summarize_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::from(items.len()),
        Value::Object(obj) => Value::from(obj.len()),
        scalar => scalar.clone(),
    }
}

/// Copy of `value` without any object field whose name starts with `prefix`,
/// at any depth.
pub fn strip_internal(value: &Value, prefix: &str) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(k, _)| !k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), strip_internal(v, prefix)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| strip_internal(v, prefix)).collect())
        }
        scalar => scalar.clone(),
    }
}
