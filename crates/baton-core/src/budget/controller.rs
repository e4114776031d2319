//! Budget Controller - 呼び出し側の上限を producer の入力に適用する
//!
//! # 不変条件
//! - 値を増やすことはない（上限より小さい値はそのまま）
//! - 同じ予算を二度適用しても二度目は何も変わらず、警告も出ない

use serde_json::{Map, Value};

use crate::domain::{AgentId, Budget, BudgetApplied, BudgetDimension, ClampRecord};

/// Warning raised once per step when any value was actually reduced.
pub const BUDGET_CLAMPED: &str = "budget_clamped";

/// Where each budget dimension lives inside one producer's input.
///
/// Paths are dotted (`search.max_requests`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetPaths {
    pub web_requests: Option<String>,
    pub items: Vec<String>,
    pub words: Option<String>,
}

impl BudgetPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn web_requests(mut self, path: impl Into<String>) -> Self {
        self.web_requests = Some(path.into());
        self
    }

    pub fn items(mut self, path: impl Into<String>) -> Self {
        self.items.push(path.into());
        self
    }

    pub fn words(mut self, path: impl Into<String>) -> Self {
        self.words = Some(path.into());
        self
    }

    pub fn for_agent(agent: AgentId) -> Self {
        let paths = BudgetPaths::new();
        match agent {
            AgentId::LocalLeadFinder => paths
                .web_requests("search.max_requests")
                .items("max_results"),
            AgentId::LeadScorer => paths.web_requests("max_requests").items("top_n"),
            AgentId::AccountResearcher => paths
                .web_requests("research.max_requests")
                .items("max_contacts")
                .words("max_words"),
            AgentId::OutreachWriter => paths.items("max_messages").words("max_words"),
            AgentId::BdrQueueBuilder => paths.items("max_rows"),
            AgentId::ContentWriter => paths
                .web_requests("research.max_requests")
                .items("max_pieces")
                .words("max_words"),
            AgentId::BoardReviewer => paths.items("max_concerns").words("max_words"),
        }
    }

    fn paths(&self, dimension: BudgetDimension) -> Vec<&str> {
        match dimension {
            BudgetDimension::WebRequests => self.web_requests.as_deref().into_iter().collect(),
            BudgetDimension::Items => self.items.iter().map(String::as_str).collect(),
            BudgetDimension::Words => self.words.as_deref().into_iter().collect(),
        }
    }
}

/// Shaped input plus the audit trail of what the budget did to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOutcome {
    pub input: Value,
    pub applied: BudgetApplied,
    pub warnings: Vec<String>,
}

/// Apply `budget` to `input` at the configured `paths`.
///
/// Only object inputs can carry budget fields; anything else is returned
/// unchanged with an empty audit record.
pub fn apply_budget(input: Value, budget: &Budget, paths: &BudgetPaths) -> BudgetOutcome {
    let mut input = input;
    let mut applied = BudgetApplied::default();
    let mut warnings = Vec::new();

    if !input.is_object() {
        return BudgetOutcome {
            input,
            applied,
            warnings,
        };
    }

    for dimension in BudgetDimension::ALL {
        let Some(ceiling) = budget.ceiling(dimension) else {
            continue;
        };
        let targets = paths.paths(dimension);
        if targets.is_empty() {
            continue;
        }
        applied.record_ceiling(dimension, ceiling);

        for path in targets {
            let current = get_path(&input, path).cloned();
            match current.as_ref().and_then(numeric) {
                Some(existing) if existing <= ceiling as f64 => {}
                Some(_) => {
                    if set_path(&mut input, path, Value::from(ceiling)) {
                        applied.clamped.push(ClampRecord {
                            dimension,
                            path: path.to_string(),
                            from: current.unwrap_or(Value::Null),
                            to: ceiling,
                        });
                    }
                }
                None => {
                    set_path(&mut input, path, Value::from(ceiling));
                }
            }
        }
    }

    if !applied.clamped.is_empty() {
        warnings.push(BUDGET_CLAMPED.to_string());
    }

    BudgetOutcome {
        input,
        applied,
        warnings,
    }
}

/// Numbers, and strings that parse as numbers. Everything else is absent.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |cur, segment| cur.get(segment))
}

/// Write `new` at `path`, creating missing intermediate objects.
///
/// Returns false when an existing intermediate value is not an object; the
/// input is left untouched in that case.
pub fn set_path(value: &mut Value, path: &str, new: Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return false;
    };

    let mut cur = value;
    for segment in segments {
        let Some(obj) = cur.as_object_mut() else {
            return false;
        };
        cur = obj
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()));
    }
    match cur.as_object_mut() {
        Some(obj) => {
            obj.insert(last.to_string(), new);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lead_finder() -> BudgetPaths {
        BudgetPaths::for_agent(AgentId::LocalLeadFinder)
    }

    #[test]
    fn clamps_larger_value_and_records_it() {
        let budget = Budget::default().with_items(10);
        let out = apply_budget(json!({"max_results": 50}), &budget, &lead_finder());

        assert_eq!(out.input["max_results"], 10);
        assert_eq!(out.warnings, vec![BUDGET_CLAMPED.to_string()]);
        assert_eq!(out.applied.max_items, Some(10));
        assert_eq!(
            out.applied.clamped,
            vec![ClampRecord {
                dimension: BudgetDimension::Items,
                path: "max_results".into(),
                from: json!(50),
                to: 10,
            }]
        );
    }

    #[test]
    fn never_increases_a_value() {
        let budget = Budget::default().with_items(10);
        let out = apply_budget(json!({"max_results": 3}), &budget, &lead_finder());
        assert_eq!(out.input["max_results"], 3);
        assert!(out.warnings.is_empty());
        assert!(out.applied.clamped.is_empty());
        assert_eq!(out.applied.max_items, Some(10));
    }

    #[test]
    fn absent_values_take_the_ceiling_without_warning() {
        let budget = Budget::default().with_web_requests(2).with_items(5);
        let out = apply_budget(json!({"query": "dentists"}), &budget, &lead_finder());
        assert_eq!(out.input["search"]["max_requests"], 2);
        assert_eq!(out.input["max_results"], 5);
        assert_eq!(out.input["query"], "dentists");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn non_numeric_value_counts_as_absent() {
        let budget = Budget::default().with_items(5);
        let out = apply_budget(json!({"max_results": "lots"}), &budget, &lead_finder());
        assert_eq!(out.input["max_results"], 5);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn numeric_strings_are_compared() {
        let budget = Budget::default().with_items(5);
        let out = apply_budget(json!({"max_results": "20"}), &budget, &lead_finder());
        assert_eq!(out.input["max_results"], 5);
        assert_eq!(out.applied.clamped[0].from, json!("20"));
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let budget = Budget::default()
            .with_web_requests(3)
            .with_items(10)
            .with_words(120);
        let paths = BudgetPaths::for_agent(AgentId::AccountResearcher);
        let input = json!({"research": {"max_requests": 9}, "max_contacts": 40, "max_words": 80});

        let first = apply_budget(input, &budget, &paths);
        assert_eq!(first.warnings, vec![BUDGET_CLAMPED.to_string()]);
        assert_eq!(first.applied.clamped.len(), 2);

        let second = apply_budget(first.input.clone(), &budget, &paths);
        assert_eq!(second.input, first.input);
        assert!(second.warnings.is_empty());
        assert!(second.applied.clamped.is_empty());
    }

    #[test]
    fn dimension_without_path_is_not_recorded() {
        let budget = Budget::default().with_web_requests(1).with_words(50);
        let out = apply_budget(json!({}), &budget, &BudgetPaths::for_agent(AgentId::BdrQueueBuilder));
        assert!(out.applied.is_empty());
        assert_eq!(out.input, json!({}));
    }

    #[test]
    fn blocked_path_leaves_input_alone() {
        let budget = Budget::default().with_web_requests(1);
        let input = json!({"search": "plain string"});
        let out = apply_budget(input.clone(), &budget, &lead_finder());
        assert_eq!(out.input, input);
    }

    #[test]
    fn non_object_input_is_untouched() {
        let out = apply_budget(json!([1, 2]), &Budget::default().with_items(1), &lead_finder());
        assert_eq!(out.input, json!([1, 2]));
        assert!(out.applied.is_empty());
    }

    #[test]
    fn dotted_paths() {
        let v = json!({"a": {"b": {"c": 1}}});
        assert_eq!(get_path(&v, "a.b.c"), Some(&json!(1)));
        assert_eq!(get_path(&v, "a.x"), None);

        let mut w = json!({});
        assert!(set_path(&mut w, "x.y", json!(2)));
        assert_eq!(w, json!({"x": {"y": 2}}));
    }
}
