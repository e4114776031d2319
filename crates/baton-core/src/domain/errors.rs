//! Errors - producer failures
//!
//! The orchestration core itself has no fatal path; these errors exist at the
//! producer seam and are converted into degraded envelopes by the orchestrator.

use thiserror::Error;

use super::agent::AgentId;

/// ProducerError は producer の失敗
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("invalid input for {agent}: {reason}")]
    InvalidInput { agent: AgentId, reason: String },

    #[error("{0}")]
    Failed(String),
}

impl ProducerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
