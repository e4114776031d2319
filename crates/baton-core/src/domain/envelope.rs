//! Envelope - `{data, meta}`: the unit every step hands to the orchestrator.
//!
//! A bare payload is only ever raw producer output. Once a result has passed
//! through the envelope validator both halves are always present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::budget::BudgetApplied;
use super::handoff::Handoff;

/// How the envelope's data came to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Produced with a real inference backend and credentials.
    Live,
    /// Produced without a live backend (heuristics, mocks, cached data).
    #[default]
    Offline,
    /// Supplied pre-computed by the caller.
    Replay,
}

/// Normalized quality flags. Every producer converges on this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityChecks {
    pub no_fabrication: bool,
    pub within_limits: bool,
    pub dedupe_ok: bool,
    pub grounding_ok: bool,
    pub schema_valid: bool,
    pub llm_connected: bool,
}

impl Default for QualityChecks {
    fn default() -> Self {
        Self {
            no_fabrication: true,
            within_limits: true,
            dedupe_ok: true,
            grounding_ok: true,
            schema_valid: true,
            llm_connected: false,
        }
    }
}

impl QualityChecks {
    /// Conjunction of two flag sets; a run is only as good as its worst step.
    pub fn and(self, other: QualityChecks) -> Self {
        Self {
            no_fabrication: self.no_fabrication && other.no_fabrication,
            within_limits: self.within_limits && other.within_limits,
            dedupe_ok: self.dedupe_ok && other.dedupe_ok,
            grounding_ok: self.grounding_ok && other.grounding_ok,
            schema_valid: self.schema_valid && other.schema_valid,
            llm_connected: self.llm_connected && other.llm_connected,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub agent_id: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub trace_id: String,
    pub mode: Mode,

    /// Sanitized copy of the step input (internal-only fields removed).
    pub input_echo: Value,

    pub quality_checks: QualityChecks,

    /// Ordered, human-readable caveats.
    pub limitations: Vec<String>,

    pub assumptions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,

    pub handoff: Option<Handoff>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_applied: Option<BudgetApplied>,

    pub knowledge_used: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_stats: Option<Value>,
}

impl Meta {
    pub fn new(
        agent_id: impl Into<String>,
        generated_at: DateTime<Utc>,
        run_id: impl Into<String>,
        trace_id: impl Into<String>,
        mode: Mode,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            generated_at,
            run_id: run_id.into(),
            trace_id: trace_id.into(),
            mode,
            input_echo: Value::Object(Default::default()),
            ..Self::default()
        }
    }

    pub fn push_limitation(&mut self, limitation: impl Into<String>) {
        self.limitations.push(limitation.into());
    }

    /// Adds a warning unless an identical one is already present.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        let warnings = self.warnings.get_or_insert_with(Vec::new);
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }

    pub fn warnings(&self) -> &[String] {
        self.warnings.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    pub meta: Meta,
}

impl Envelope {
    pub fn new(data: Value, meta: Meta) -> Self {
        Self { data, meta }
    }

    /// Whether a raw value already has the `{data, meta}` outer shape.
    pub fn is_enveloped(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| o.contains_key("data") && o.contains_key("meta"))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
