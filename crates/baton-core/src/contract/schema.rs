//! Shallow schemas: required top-level keys and their coarse kinds.

use serde_json::Value;

use crate::domain::{AgentId, JsonKind};

/// One required key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub key: String,
    pub kind: JsonKind,
}

/// A required-keys-and-kinds map over the top level of a payload.
///
/// Validation never fails fast: every problem is collected so the caller sees
/// the full list in `meta.limitations`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>, kind: JsonKind) -> Self {
        self.fields.push(FieldRule {
            key: key.into(),
            kind,
        });
        self
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    /// The schema every output of `agent` is checked against.
    pub fn for_agent(agent: AgentId) -> Self {
        let schema = Schema::new();
        match agent {
            AgentId::LocalLeadFinder => schema.require("leads", JsonKind::Array),
            AgentId::LeadScorer => schema.require("hot_leads", JsonKind::Array),
            AgentId::AccountResearcher => schema.require("account", JsonKind::Object),
            AgentId::OutreachWriter => schema.require("messages", JsonKind::Array),
            AgentId::BdrQueueBuilder => schema.require("bdr_queue", JsonKind::Array),
            AgentId::ContentWriter => schema.require("pieces", JsonKind::Array),
            AgentId::BoardReviewer => schema
                .require("verdict", JsonKind::String)
                .require("concerns", JsonKind::Array),
        }
    }

    /// Human-readable errors, empty when `data` conforms.
    pub fn validate(&self, data: &Value) -> Vec<String> {
        let Some(obj) = data.as_object() else {
            if self.fields.is_empty() {
                return Vec::new();
            }
            return vec![format!("payload must be an object, got {}", JsonKind::of(data))];
        };

        let mut errors = Vec::new();
        for rule in &self.fields {
            match obj.get(&rule.key) {
                None => errors.push(format!("missing required key `{}`", rule.key)),
                Some(v) if !rule.kind.matches(v) => errors.push(format!(
                    "key `{}` must be {}, got {}",
                    rule.key,
                    rule.kind,
                    JsonKind::of(v)
                )),
                Some(_) => {}
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_conforming_payload() {
        let schema = Schema::for_agent(AgentId::BoardReviewer);
        let errors = schema.validate(&json!({"verdict": "go", "concerns": [], "extra": 1}));
        assert!(errors.is_empty());
    }

    #[test]
    fn collects_every_error() {
        let schema = Schema::for_agent(AgentId::BoardReviewer);
        let errors = schema.validate(&json!({"verdict": 3}));
        assert_eq!(
            errors,
            vec![
                "key `verdict` must be string, got number".to_string(),
                "missing required key `concerns`".to_string(),
            ]
        );
    }

    #[test]
    fn non_object_payload_is_one_error() {
        let errors = Schema::for_agent(AgentId::LocalLeadFinder).validate(&json!([1, 2]));
        assert_eq!(errors, vec!["payload must be an object, got array".to_string()]);
    }

    #[test]
    fn any_kind_only_requires_presence() {
        let schema = Schema::new().require("notes", JsonKind::Any);
        assert!(schema.validate(&json!({"notes": null})).is_empty());
        assert_eq!(schema.validate(&json!({})).len(), 1);
    }

    #[test]
    fn every_agent_has_a_schema() {
        for agent in AgentId::ALL {
            assert!(!Schema::for_agent(agent).fields().is_empty(), "{agent}");
        }
    }
}
