//! Handoff descriptor: what a step's output exposes and who may consume it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::agent::{AgentId, HandoffType};

/// The only descriptor shape in existence. Anything else is a contract break.
pub const HANDOFF_VERSION: &str = "1.0";

/// A typed, versioned descriptor attached to `meta.handoff`.
///
/// Built once per producer invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    #[serde(rename = "type")]
    pub handoff_type: HandoffType,
    pub version: String,
    pub entities: Map<String, Value>,
    pub recommended_next_agents: Vec<AgentId>,
    pub compat: Vec<AgentId>,
}

impl Handoff {
    /// Descriptor for `handoff_type` with the static compat list and no advisory successors.
    pub fn new(handoff_type: HandoffType, entities: Map<String, Value>) -> Self {
        Self {
            handoff_type,
            version: HANDOFF_VERSION.to_string(),
            entities,
            recommended_next_agents: Vec::new(),
            compat: handoff_type.compat().to_vec(),
        }
    }

    pub fn with_recommended(mut self, agents: &[AgentId]) -> Self {
        self.recommended_next_agents = agents.to_vec();
        self
    }
}
