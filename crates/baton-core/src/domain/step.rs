//! Step records: one per executed step, read-only once appended.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::agent::{AgentId, HandoffType};
use super::envelope::Mode;

/// Diagnostic view of a step envelope's meta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetaSummary {
    pub handoff_type: Option<HandoffType>,
    pub mode: Mode,
    pub schema_valid: bool,
    pub limitations: usize,
    pub warnings: usize,
}

/// Observability record that ends up in the final `data.steps` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: String,
    pub agent_id: AgentId,
    pub ok: bool,
    pub output_meta_summary: StepMetaSummary,
    pub output_data_summary: Value,
}
