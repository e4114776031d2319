//! Goals - 名前付きワークフローの静的定義
//!
//! 各 goal は固定されたステップ列、ステップ間のエッジ（どの上流エンティティを
//! どの入力キーに渡すか）、最終ペイロードの組み立て方を持ちます。

use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;

use crate::contract::NormalizedStep;
use crate::domain::{AgentId, Handoff, HandoffType};

/// One forwarded entity: `from.entity` becomes the consumer's `into` input key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub entity: &'static str,
    pub into: &'static str,
}

/// `edge!("leads", "leads")`: forward under the same key.
macro_rules! edge {
    ($from:literal, $entity:literal) => {
        Edge {
            from: $from,
            entity: $entity,
            into: $entity,
        }
    };
}

/// Gate for an optional step, evaluated against the outputs so far.
pub type StepCondition = fn(&StepOutputs) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub step_id: &'static str,
    pub agent: AgentId,
    pub consumes: &'static [Edge],
    /// `None` means the step always runs.
    pub condition: Option<StepCondition>,
}

impl StepSpec {
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

const fn step(step_id: &'static str, agent: AgentId, consumes: &'static [Edge]) -> StepSpec {
    StepSpec {
        step_id,
        agent,
        consumes,
        condition: None,
    }
}

static LOCAL_DM_READY: [StepSpec; 3] = [
    step("leads", AgentId::LocalLeadFinder, &[]),
    step("messages", AgentId::OutreachWriter, &[edge!("leads", "leads")]),
    step(
        "queue",
        AgentId::BdrQueueBuilder,
        &[edge!("leads", "leads"), edge!("messages", "messages")],
    ),
];

static HOT_LEADS_QUEUE: [StepSpec; 3] = [
    step("leads", AgentId::LocalLeadFinder, &[]),
    step("scoring", AgentId::LeadScorer, &[edge!("leads", "leads")]),
    step("queue", AgentId::BdrQueueBuilder, &[edge!("scoring", "hot_leads")]),
];

static ACCOUNT_DEEP_DIVE: [StepSpec; 4] = [
    step("scoring", AgentId::LeadScorer, &[]),
    step("account", AgentId::AccountResearcher, &[edge!("scoring", "hot_leads")]),
    StepSpec {
        step_id: "outreach",
        agent: AgentId::OutreachWriter,
        consumes: &[edge!("account", "account")],
        condition: Some(account_has_contacts),
    },
    step(
        "review",
        AgentId::BoardReviewer,
        &[edge!("account", "account"), edge!("outreach", "messages")],
    ),
];

static CONTENT_REVIEW: [StepSpec; 2] = [
    step("content", AgentId::ContentWriter, &[]),
    step("review", AgentId::BoardReviewer, &[edge!("content", "pieces")]),
];

fn account_has_contacts(outputs: &StepOutputs) -> bool {
    let non_empty = |v: Option<&Value>| v.and_then(Value::as_array).is_some_and(|a| !a.is_empty());
    non_empty(outputs.entity("account", "contacts"))
        || non_empty(
            outputs
                .entity("account", "account")
                .and_then(|a| a.get("contacts")),
        )
}

/// Normalized outputs of the steps executed so far, keyed by step id.
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    by_step: HashMap<&'static str, NormalizedStep>,
}

impl StepOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, step_id: &'static str, step: NormalizedStep) {
        self.by_step.insert(step_id, step);
    }

    pub fn get(&self, step_id: &str) -> Option<&NormalizedStep> {
        self.by_step.get(step_id)
    }

    pub fn entity(&self, step_id: &str, key: &str) -> Option<&Value> {
        self.get(step_id).and_then(|s| s.entity(key))
    }

    fn entity_or(&self, step_id: &str, key: &str, fallback: Value) -> Value {
        self.entity(step_id, key).cloned().unwrap_or(fallback)
    }

    fn len_of(&self, step_id: &str, key: &str) -> usize {
        self.entity(step_id, key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// Workflows the orchestrator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Goal {
    LocalDmReady,
    HotLeadsQueue,
    AccountDeepDive,
    ContentReview,
}

impl Goal {
    pub const ALL: [Goal; 4] = [
        Goal::LocalDmReady,
        Goal::HotLeadsQueue,
        Goal::AccountDeepDive,
        Goal::ContentReview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Goal::LocalDmReady => "local_dm_ready",
            Goal::HotLeadsQueue => "hot_leads_queue",
            Goal::AccountDeepDive => "account_deep_dive",
            Goal::ContentReview => "content_review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Goal::ALL.into_iter().find(|g| g.as_str() == s)
    }

    pub fn steps(self) -> &'static [StepSpec] {
        match self {
            Goal::LocalDmReady => &LOCAL_DM_READY,
            Goal::HotLeadsQueue => &HOT_LEADS_QUEUE,
            Goal::AccountDeepDive => &ACCOUNT_DEEP_DIVE,
            Goal::ContentReview => &CONTENT_REVIEW,
        }
    }

    /// Every agent this goal may invoke, in step order.
    pub fn agents(self) -> Vec<AgentId> {
        let mut agents = Vec::new();
        for s in self.steps() {
            if !agents.contains(&s.agent) {
                agents.push(s.agent);
            }
        }
        agents
    }

    /// Goal-specific `final` payload built from the normalized step outputs.
    pub fn assemble_final(self, outputs: &StepOutputs) -> Value {
        match self {
            Goal::LocalDmReady => json!({
                "bdr_table": outputs.entity_or("queue", "queue", json!([])),
                "leads_count": outputs.len_of("leads", "leads"),
                "messages_count": outputs.len_of("messages", "messages"),
            }),
            Goal::HotLeadsQueue => json!({
                "bdr_table": outputs.entity_or("queue", "queue", json!([])),
                "hot_leads_count": outputs.len_of("scoring", "hot_leads"),
            }),
            Goal::AccountDeepDive => json!({
                "account": outputs.entity_or("account", "account", Value::Null),
                "contacts": outputs.entity_or("account", "contacts", json!([])),
                "outreach": outputs.entity_or("outreach", "messages", Value::Null),
                "verdict": outputs.entity_or("review", "verdict", Value::Null),
                "concerns": outputs.entity_or("review", "concerns", json!([])),
            }),
            Goal::ContentReview => json!({
                "pieces": outputs.entity_or("content", "pieces", json!([])),
                "summary": outputs.entity_or("content", "summary", json!("")),
                "verdict": outputs.entity_or("review", "verdict", Value::Null),
                "concerns": outputs.entity_or("review", "concerns", json!([])),
            }),
        }
    }

    /// Descriptor for the final artifact when no step resolved to a type.
    pub fn synthetic_handoff(self, final_payload: &Value) -> Handoff {
        let pick = |keys: &[(&str, &str)]| -> Map<String, Value> {
            keys.iter()
                .map(|(from, to)| {
                    (
                        to.to_string(),
                        final_payload.get(*from).cloned().unwrap_or(Value::Null),
                    )
                })
                .collect()
        };
        match self {
            Goal::LocalDmReady | Goal::HotLeadsQueue => {
                Handoff::new(HandoffType::BdrQueue, pick(&[("bdr_table", "queue")]))
            }
            Goal::AccountDeepDive => Handoff::new(
                HandoffType::AccountCard,
                pick(&[("account", "account"), ("contacts", "contacts")]),
            ),
            Goal::ContentReview => Handoff::new(
                HandoffType::ContentPack,
                pick(&[("pieces", "pieces"), ("summary", "summary")]),
            ),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::normalize_step;

    #[test]
    fn goal_names_roundtrip() {
        for goal in Goal::ALL {
            assert_eq!(Goal::parse(goal.as_str()), Some(goal));
        }
        assert_eq!(Goal::parse("does_not_exist"), None);
    }

    #[test]
    fn edges_only_reference_earlier_steps() {
        for goal in Goal::ALL {
            let steps = goal.steps();
            for (i, s) in steps.iter().enumerate() {
                for e in s.consumes {
                    let upstream = steps[..i].iter().find(|u| u.step_id == e.from);
                    assert!(upstream.is_some(), "{goal}: {} <- {}", s.step_id, e.from);
                }
            }
        }
    }

    #[test]
    fn declared_edges_are_compatible() {
        // goal の定義自体が compat テーブルに違反していないこと
        for goal in Goal::ALL {
            let steps = goal.steps();
            for s in steps {
                for e in s.consumes {
                    let upstream = steps.iter().find(|u| u.step_id == e.from).unwrap();
                    assert!(
                        upstream.agent.handoff_type().accepts(s.agent),
                        "{goal}: {} -> {}",
                        upstream.agent,
                        s.agent
                    );
                }
            }
        }
    }

    #[test]
    fn local_dm_ready_shape() {
        let ids: Vec<_> = Goal::LocalDmReady.steps().iter().map(|s| s.step_id).collect();
        assert_eq!(ids, ["leads", "messages", "queue"]);
        assert_eq!(
            Goal::LocalDmReady.agents(),
            vec![
                AgentId::LocalLeadFinder,
                AgentId::OutreachWriter,
                AgentId::BdrQueueBuilder
            ]
        );
    }

    #[test]
    fn outreach_condition_reads_contacts() {
        let spec = Goal::AccountDeepDive.steps()[2];
        let condition = spec.condition.unwrap();

        let mut outputs = StepOutputs::new();
        assert!(!condition(&outputs));

        outputs.insert(
            "account",
            normalize_step(AgentId::AccountResearcher, &json!({"account": {"name": "Acme"}})),
        );
        assert!(!condition(&outputs));

        outputs.insert(
            "account",
            normalize_step(
                AgentId::AccountResearcher,
                &json!({"account": {"name": "Acme", "contacts": [{"name": "Ana"}]}}),
            ),
        );
        assert!(condition(&outputs));
    }

    #[test]
    fn final_payload_counts() {
        let mut outputs = StepOutputs::new();
        outputs.insert(
            "leads",
            normalize_step(AgentId::LocalLeadFinder, &json!({"leads": [1, 2, 3]})),
        );
        outputs.insert(
            "queue",
            normalize_step(AgentId::BdrQueueBuilder, &json!({"bdr_queue": [{"row": 1}]})),
        );
        let final_payload = Goal::LocalDmReady.assemble_final(&outputs);
        assert_eq!(
            final_payload,
            json!({"bdr_table": [{"row": 1}], "leads_count": 3, "messages_count": 0})
        );

        let handoff = Goal::LocalDmReady.synthetic_handoff(&final_payload);
        assert_eq!(handoff.handoff_type, HandoffType::BdrQueue);
        assert_eq!(handoff.entities["queue"], json!([{"row": 1}]));
        assert!(handoff.recommended_next_agents.is_empty());
    }
}
