//! Caller budgets and the audit record left behind when one is applied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ceilings a caller imposes on every step of a run.
///
/// A budget only narrows producer inputs; it never widens them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_web_requests: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words: Option<u64>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_web_requests(mut self, n: u64) -> Self {
        self.max_web_requests = Some(n);
        self
    }

    pub fn with_items(mut self, n: u64) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn with_words(mut self, n: u64) -> Self {
        self.max_words = Some(n);
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_web_requests.is_none() && self.max_items.is_none() && self.max_words.is_none()
    }

    pub fn ceiling(&self, dimension: BudgetDimension) -> Option<u64> {
        match dimension {
            BudgetDimension::WebRequests => self.max_web_requests,
            BudgetDimension::Items => self.max_items,
            BudgetDimension::Words => self.max_words,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDimension {
    WebRequests,
    Items,
    Words,
}

impl BudgetDimension {
    pub const ALL: [BudgetDimension; 3] = [
        BudgetDimension::WebRequests,
        BudgetDimension::Items,
        BudgetDimension::Words,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetDimension::WebRequests => "max_web_requests",
            BudgetDimension::Items => "max_items",
            BudgetDimension::Words => "max_words",
        }
    }
}

impl fmt::Display for BudgetDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input value the controller reduced. `from` keeps the caller's
/// original value as written (number or numeric string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClampRecord {
    pub dimension: BudgetDimension,
    pub path: String,
    pub from: serde_json::Value,
    pub to: u64,
}

/// `meta.budget_applied`: the ceilings that took effect for one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetApplied {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_web_requests: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clamped: Vec<ClampRecord>,
}

impl BudgetApplied {
    pub fn record_ceiling(&mut self, dimension: BudgetDimension, ceiling: u64) {
        let slot = match dimension {
            BudgetDimension::WebRequests => &mut self.max_web_requests,
            BudgetDimension::Items => &mut self.max_items,
            BudgetDimension::Words => &mut self.max_words,
        };
        *slot = Some(ceiling);
    }

    pub fn is_empty(&self) -> bool {
        self.max_web_requests.is_none()
            && self.max_items.is_none()
            && self.max_words.is_none()
            && self.clamped.is_empty()
    }
}
