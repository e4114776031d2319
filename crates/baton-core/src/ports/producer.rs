//! Producer port - the seam between the orchestrator and the agents it chains.
//!
//! The orchestrator places no constraint on what a producer does internally
//! (blocking work, fan-out, its own retries); it awaits one result per step.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{AgentId, ProducerError};

/// A producer turns a shaped input object into either a bare payload or a
/// `{data, meta}` envelope.
///
/// Producers should be replayable: the orchestrator accepts a previously
/// captured output in place of a live call.
#[async_trait]
pub trait Producer: Send + Sync {
    fn agent(&self) -> AgentId;

    async fn run(&self, input: Value) -> Result<Value, ProducerError>;
}
