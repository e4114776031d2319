//! Handoff Builder: producer identity + output data -> typed descriptor.

use serde_json::Value;

use super::extract::entities_for;
use crate::domain::{AgentId, Handoff};

/// Build the descriptor for one producer invocation.
///
/// The type and the advisory successors come from the producer's identity;
/// `compat` always comes from the static table for that type.
pub fn build_handoff(agent: AgentId, data: &Value) -> Handoff {
    let handoff_type = agent.handoff_type();
    Handoff::new(handoff_type, entities_for(handoff_type, data))
        .with_recommended(agent.recommended_next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HANDOFF_VERSION, HandoffType};
    use serde_json::json;

    #[test]
    fn compat_always_matches_static_table() {
        // 古い形・新しい形・空の出力のどれでも compat は型の静的テーブルと一致する
        let payloads = [
            json!({}),
            json!({"leads": [{"name": "a"}], "legacy_field": true}),
            json!({"data": {"messages": "hi"}}),
            json!("not even an object"),
        ];
        for agent in AgentId::ALL {
            for data in &payloads {
                let handoff = build_handoff(agent, data);
                assert_eq!(handoff.handoff_type, agent.handoff_type());
                assert_eq!(handoff.compat, agent.handoff_type().compat());
                assert_eq!(handoff.version, HANDOFF_VERSION);
            }
        }
    }

    #[test]
    fn lead_finder_descriptor() {
        let data = json!({"leads": [{"name": "Smile Dental"}], "notes": "x"});
        let handoff = build_handoff(AgentId::LocalLeadFinder, &data);
        assert_eq!(handoff.handoff_type, HandoffType::LeadsTable);
        assert_eq!(handoff.entities["leads"], json!([{"name": "Smile Dental"}]));
        assert_eq!(
            handoff.recommended_next_agents,
            vec![AgentId::LeadScorer, AgentId::OutreachWriter]
        );
        assert!(handoff.compat.contains(&AgentId::OutreachWriter));
    }

    #[test]
    fn partial_account_still_yields_valid_descriptor() {
        let handoff = build_handoff(AgentId::AccountResearcher, &json!({"notes": "nothing found"}));
        assert_eq!(handoff.entities["account"], json!({}));
        assert_eq!(handoff.entities["contacts"], json!([]));
    }
}
