//! Domain model (ids, agents, handoffs, envelopes, budgets, step records).

pub mod agent;
pub mod budget;
pub mod envelope;
pub mod errors;
pub mod handoff;
pub mod ids;
pub mod json_kind;
pub mod step;

pub use agent::{AgentId, HandoffType, UnknownAgent};
pub use budget::{Budget, BudgetApplied, BudgetDimension, ClampRecord};
pub use envelope::{Envelope, Meta, Mode, QualityChecks};
pub use errors::ProducerError;
pub use handoff::{HANDOFF_VERSION, Handoff};
pub use ids::{RunId, TraceId};
pub use json_kind::JsonKind;
pub use step::{StepMetaSummary, StepRecord};
