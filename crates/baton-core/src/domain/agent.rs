//! Producer identities and the handoff types they emit.
//!
//! Both sets are closed. The static tables that relate them (which type an
//! agent emits, which agents may consume a type, which agent conventionally
//! follows which) live here so every component reads the same contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::json_kind::JsonKind;

/// The producers the orchestrator knows how to chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    LocalLeadFinder,
    LeadScorer,
    AccountResearcher,
    OutreachWriter,
    BdrQueueBuilder,
    ContentWriter,
    BoardReviewer,
}

impl AgentId {
    pub const ALL: [AgentId; 7] = [
        AgentId::LocalLeadFinder,
        AgentId::LeadScorer,
        AgentId::AccountResearcher,
        AgentId::OutreachWriter,
        AgentId::BdrQueueBuilder,
        AgentId::ContentWriter,
        AgentId::BoardReviewer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentId::LocalLeadFinder => "local_lead_finder",
            AgentId::LeadScorer => "lead_scorer",
            AgentId::AccountResearcher => "account_researcher",
            AgentId::OutreachWriter => "outreach_writer",
            AgentId::BdrQueueBuilder => "bdr_queue_builder",
            AgentId::ContentWriter => "content_writer",
            AgentId::BoardReviewer => "board_reviewer",
        }
    }

    /// The handoff type this producer's output is described as.
    pub fn handoff_type(self) -> HandoffType {
        match self {
            AgentId::LocalLeadFinder => HandoffType::LeadsTable,
            AgentId::LeadScorer => HandoffType::HotLeads,
            AgentId::AccountResearcher => HandoffType::AccountCard,
            AgentId::OutreachWriter => HandoffType::MessagesPack,
            AgentId::BdrQueueBuilder => HandoffType::BdrQueue,
            AgentId::ContentWriter => HandoffType::ContentPack,
            AgentId::BoardReviewer => HandoffType::BoardReview,
        }
    }

    /// Advisory follow-up producers, keyed by producer rather than by type.
    pub fn recommended_next(self) -> &'static [AgentId] {
        use AgentId::*;
        match self {
            LocalLeadFinder => &[LeadScorer, OutreachWriter],
            LeadScorer => &[AccountResearcher, OutreachWriter],
            AccountResearcher => &[OutreachWriter],
            OutreachWriter => &[BdrQueueBuilder],
            BdrQueueBuilder => &[BoardReviewer],
            ContentWriter => &[BoardReviewer],
            BoardReviewer => &[],
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent id `{0}`")]
pub struct UnknownAgent(pub String);

impl FromStr for AgentId {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentId::ALL
            .into_iter()
            .find(|agent| agent.as_str() == s)
            .ok_or_else(|| UnknownAgent(s.to_string()))
    }
}

/// Semantic shape of a step's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffType {
    LeadsTable,
    AccountCard,
    HotLeads,
    MessagesPack,
    BdrQueue,
    BoardReview,
    ContentPack,
}

impl HandoffType {
    pub const ALL: [HandoffType; 7] = [
        HandoffType::LeadsTable,
        HandoffType::AccountCard,
        HandoffType::HotLeads,
        HandoffType::MessagesPack,
        HandoffType::BdrQueue,
        HandoffType::BoardReview,
        HandoffType::ContentPack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HandoffType::LeadsTable => "leads_table",
            HandoffType::AccountCard => "account_card",
            HandoffType::HotLeads => "hot_leads",
            HandoffType::MessagesPack => "messages_pack",
            HandoffType::BdrQueue => "bdr_queue",
            HandoffType::BoardReview => "board_review",
            HandoffType::ContentPack => "content_pack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        HandoffType::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Consumers allowed to receive this type. Static per type so the list
    /// never depends on which producer version emitted the descriptor.
    pub fn compat(self) -> &'static [AgentId] {
        use AgentId::*;
        match self {
            HandoffType::LeadsTable => &[
                LeadScorer,
                AccountResearcher,
                OutreachWriter,
                BdrQueueBuilder,
            ],
            HandoffType::HotLeads => &[AccountResearcher, OutreachWriter, BdrQueueBuilder],
            HandoffType::AccountCard => &[OutreachWriter, BdrQueueBuilder, BoardReviewer],
            HandoffType::MessagesPack => &[BdrQueueBuilder, BoardReviewer],
            HandoffType::BdrQueue => &[BoardReviewer],
            HandoffType::ContentPack => &[BoardReviewer],
            HandoffType::BoardReview => &[],
        }
    }

    pub fn accepts(self, consumer: AgentId) -> bool {
        self.compat().contains(&consumer)
    }

    /// The entity key that must be present, with this kind, for explicit
    /// handoff entities to be trusted as well-typed.
    pub fn primary_entity(self) -> (&'static str, JsonKind) {
        match self {
            HandoffType::LeadsTable => ("leads", JsonKind::Array),
            HandoffType::HotLeads => ("hot_leads", JsonKind::Array),
            HandoffType::AccountCard => ("account", JsonKind::Object),
            HandoffType::MessagesPack => ("messages", JsonKind::Array),
            HandoffType::BdrQueue => ("queue", JsonKind::Array),
            HandoffType::ContentPack => ("pieces", JsonKind::Array),
            HandoffType::BoardReview => ("verdict", JsonKind::String),
        }
    }
}

impl fmt::Display for HandoffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn agent_ids_roundtrip_through_strings() {
        for agent in AgentId::ALL {
            assert_eq!(agent.as_str().parse::<AgentId>(), Ok(agent));
            let json = serde_json::to_value(agent).unwrap();
            assert_eq!(json, serde_json::Value::String(agent.as_str().to_string()));
        }
        assert!("nobody".parse::<AgentId>().is_err());
    }

    #[test]
    fn handoff_type_serializes_as_wire_name() {
        for t in HandoffType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(HandoffType::parse(t.as_str()), Some(t));
        }
    }

    #[rstest]
    #[case::leads_to_writer(HandoffType::LeadsTable, AgentId::OutreachWriter, true)]
    #[case::messages_to_queue(HandoffType::MessagesPack, AgentId::BdrQueueBuilder, true)]
    #[case::messages_to_scorer(HandoffType::MessagesPack, AgentId::LeadScorer, false)]
    #[case::queue_to_writer(HandoffType::BdrQueue, AgentId::OutreachWriter, false)]
    #[case::review_is_terminal(HandoffType::BoardReview, AgentId::BoardReviewer, false)]
    fn compat_table_gates_consumers(
        #[case] handoff: HandoffType,
        #[case] consumer: AgentId,
        #[case] expected: bool,
    ) {
        assert_eq!(handoff.accepts(consumer), expected);
    }

    #[test]
    fn every_recommendation_is_compatible() {
        for agent in AgentId::ALL {
            for next in agent.recommended_next() {
                assert!(
                    agent.handoff_type().accepts(*next),
                    "{agent} recommends {next} but {} does not accept it",
                    agent.handoff_type()
                );
            }
        }
    }
}
