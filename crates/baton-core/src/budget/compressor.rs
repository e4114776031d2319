//! Shape-preserving compressor.
//!
//! Fits a nested payload under a word budget without ever removing a key.
//! Passes run in a fixed order and stop as soon as the payload fits:
//!
//! 1. per-string caps on prose keys (`primary_passes`, only under `text_keys`)
//! 2. per-string caps on every string (`global_passes`)
//! 3. clear `secondary_fields`
//! 4. pop trailing array elements down to their declared floor
//! 5. cap every string to [`LAST_RESORT_WORDS`]

use serde::Serialize;
use serde_json::Value;

use crate::domain::AgentId;

pub const DEFAULT_PRIMARY_PASSES: [usize; 6] = [80, 50, 30, 20, 12, 8];
pub const DEFAULT_GLOBAL_PASSES: [usize; 4] = [40, 20, 12, 6];
pub const LAST_RESORT_WORDS: usize = 2;

/// Which parts of a payload may shrink first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionProfile {
    /// Keys whose string values (at any depth) are prose.
    pub text_keys: Vec<String>,
    /// Keys whose values are cleared when capping alone is not enough.
    pub secondary_fields: Vec<String>,
    pub primary_passes: Vec<usize>,
    pub global_passes: Vec<usize>,
    /// Dotted array paths and the length they never shrink below.
    pub array_minimums: Vec<(String, usize)>,
}

impl Default for CompressionProfile {
    fn default() -> Self {
        Self {
            text_keys: Vec::new(),
            secondary_fields: Vec::new(),
            primary_passes: DEFAULT_PRIMARY_PASSES.to_vec(),
            global_passes: DEFAULT_GLOBAL_PASSES.to_vec(),
            array_minimums: Vec::new(),
        }
    }
}

impl CompressionProfile {
    pub fn text_keys(mut self, keys: &[&str]) -> Self {
        self.text_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn secondary_fields(mut self, keys: &[&str]) -> Self {
        self.secondary_fields = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn array_minimum(mut self, path: impl Into<String>, min: usize) -> Self {
        self.array_minimums.push((path.into(), min));
        self
    }

    pub fn for_agent(agent: AgentId) -> Self {
        let profile = CompressionProfile::default();
        match agent {
            AgentId::LocalLeadFinder => profile
                .text_keys(&["notes", "summary", "description"])
                .secondary_fields(&["raw_snippets", "sources"])
                .array_minimum("leads", 1),
            AgentId::LeadScorer => profile
                .text_keys(&["rationale", "notes"])
                .secondary_fields(&["signals"])
                .array_minimum("hot_leads", 1),
            AgentId::AccountResearcher => profile
                .text_keys(&["summary", "notes", "pain_points"])
                .secondary_fields(&["sources", "raw_snippets"])
                .array_minimum("account.contacts", 1),
            AgentId::OutreachWriter => profile
                .text_keys(&["body", "text", "followup"])
                .secondary_fields(&["alternatives", "notes"])
                .array_minimum("messages", 1),
            AgentId::BdrQueueBuilder => profile
                .text_keys(&["notes", "next_action"])
                .secondary_fields(&["context"])
                .array_minimum("bdr_queue", 1),
            AgentId::ContentWriter => profile
                .text_keys(&["body", "text"])
                .secondary_fields(&["outline", "sources"])
                .array_minimum("pieces", 1),
            AgentId::BoardReviewer => profile
                .text_keys(&["rationale", "notes"])
                .secondary_fields(&["evidence"])
                .array_minimum("concerns", 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    pub within: bool,
    pub compressed: bool,
    pub compressed_heavily: bool,
    pub words_before: usize,
    pub words_after: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub payload: Value,
    pub report: CompressionReport,
}

/// Whitespace-separated tokens inside string values. Keys, numbers and
/// booleans count zero.
pub fn count_words(value: &Value) -> usize {
    match value {
        Value::String(s) => s.split_whitespace().count(),
        Value::Array(items) => items.iter().map(count_words).sum(),
        Value::Object(obj) => obj.values().map(count_words).sum(),
        _ => 0,
    }
}

pub fn compress(payload: Value, max_words: usize, profile: &CompressionProfile) -> Compressed {
    let mut payload = payload;
    let words_before = count_words(&payload);
    let mut total = words_before;
    let mut heavy = false;

    if total > max_words {
        for &cap in &profile.primary_passes {
            cap_strings(&mut payload, cap, &Scope::TextKeys(&profile.text_keys), false);
            total = count_words(&payload);
            if total <= max_words {
                break;
            }
        }
    }

    if total > max_words {
        for &cap in &profile.global_passes {
            cap_strings(&mut payload, cap, &Scope::Everything, false);
            total = count_words(&payload);
            if total <= max_words {
                break;
            }
        }
    }

    if total > max_words && !profile.secondary_fields.is_empty() {
        heavy |= clear_secondary(&mut payload, &profile.secondary_fields);
        total = count_words(&payload);
    }

    if total > max_words {
        // 配列を削る段階に来た時点で内容は失われる
        heavy = true;
        for (path, min) in &profile.array_minimums {
            truncate_array(&mut payload, path, *min, max_words, &mut total);
            if total <= max_words {
                break;
            }
        }
    }

    if total > max_words {
        cap_strings(&mut payload, LAST_RESORT_WORDS, &Scope::Everything, false);
        total = count_words(&payload);
    }

    let within = total <= max_words;
    Compressed {
        payload,
        report: CompressionReport {
            within,
            compressed: heavy || total < words_before,
            compressed_heavily: heavy || !within,
            words_before,
            words_after: total,
        },
    }
}

enum Scope<'a> {
    TextKeys(&'a [String]),
    Everything,
}

/// Cap strings to `cap` words. Under [`Scope::TextKeys`] only strings reached
/// through a named key are touched; `inside` tracks whether we already are.
fn cap_strings(value: &mut Value, cap: usize, scope: &Scope<'_>, inside: bool) {
    let applies = match scope {
        Scope::Everything => true,
        Scope::TextKeys(_) => inside,
    };
    match value {
        Value::String(s) if applies => {
            if s.split_whitespace().count() > cap {
                *s = s.split_whitespace().take(cap).collect::<Vec<_>>().join(" ");
            }
        }
        Value::Array(items) => {
            for item in items {
                cap_strings(item, cap, scope, inside);
            }
        }
        Value::Object(obj) => {
            for (key, child) in obj.iter_mut() {
                let named = match scope {
                    Scope::TextKeys(keys) => keys.iter().any(|k| k == key),
                    Scope::Everything => false,
                };
                cap_strings(child, cap, scope, inside || named);
            }
        }
        _ => {}
    }
}

/// Empty every value stored under a secondary key, keeping its type.
/// Objects keep their keys; their leaves are emptied instead.
fn clear_secondary(value: &mut Value, fields: &[String]) -> bool {
    let mut changed = false;
    match value {
        Value::Array(items) => {
            for item in items {
                changed |= clear_secondary(item, fields);
            }
        }
        Value::Object(obj) => {
            for (key, child) in obj.iter_mut() {
                if fields.iter().any(|f| f == key) {
                    changed |= empty_in_place(child);
                } else {
                    changed |= clear_secondary(child, fields);
                }
            }
        }
        _ => {}
    }
    changed
}

fn empty_in_place(value: &mut Value) -> bool {
    match value {
        Value::String(s) if !s.is_empty() => {
            s.clear();
            true
        }
        Value::Array(items) if !items.is_empty() => {
            items.clear();
            true
        }
        Value::Object(obj) => obj
            .values_mut()
            .fold(false, |changed, child| empty_in_place(child) || changed),
        _ => false,
    }
}

/// Pop trailing elements of the array at `path` until the budget fits,
/// never going below `min`. Word-free elements are popped too so they do not
/// shield the ones before them.
fn truncate_array(payload: &mut Value, path: &str, min: usize, max_words: usize, total: &mut usize) {
    let Some(Value::Array(items)) = get_path_mut(payload, path) else {
        return;
    };

    while *total > max_words && items.len() > min {
        let Some(last) = items.pop() else {
            break;
        };
        *total -= count_words(&last);
    }
}

fn get_path_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(value, |cur, segment| cur.get_mut(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys_of(value: &Value, prefix: &str, out: &mut Vec<String>) {
        if let Value::Object(obj) = value {
            for (k, v) in obj {
                let path = format!("{prefix}/{k}");
                out.push(path.clone());
                keys_of(v, &path, out);
            }
        }
    }

    #[test]
    fn trims_prose_and_leaves_numeric_array() {
        let profile = CompressionProfile {
            primary_passes: vec![4, 2],
            ..CompressionProfile::default()
                .text_keys(&["a"])
                .array_minimum("list", 1)
        };
        let out = compress(json!({"a": "one two three four five", "list": [1, 2, 3]}), 2, &profile);

        assert_eq!(out.payload["a"], "one two");
        assert_eq!(out.payload["list"], json!([1, 2, 3]));
        assert!(out.report.within);
        assert!(out.report.compressed);
        assert!(!out.report.compressed_heavily);
        assert_eq!(out.report.words_before, 5);
        assert_eq!(out.report.words_after, 2);
    }

    #[test]
    fn already_within_budget_is_untouched() {
        let payload = json!({"a": "short text"});
        let out = compress(payload.clone(), 10, &CompressionProfile::default());
        assert_eq!(out.payload, payload);
        assert!(out.report.within);
        assert!(!out.report.compressed);
    }

    #[test]
    fn primary_pass_only_touches_text_keys() {
        let long = (0..100).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let profile = CompressionProfile::default().text_keys(&["body"]);
        let payload = json!({"messages": [{"body": long, "subject": "a b c"}]});
        let out = compress(payload, 83, &profile);

        assert_eq!(count_words(&out.payload["messages"][0]["body"]), 80);
        assert_eq!(out.payload["messages"][0]["subject"], "a b c");
        assert!(out.report.within);
    }

    #[test]
    fn secondary_fields_are_cleared_by_type() {
        let profile = CompressionProfile {
            primary_passes: vec![],
            global_passes: vec![],
            ..CompressionProfile::default().secondary_fields(&["sources", "notes", "meta"])
        };
        let payload = json!({
            "leads": ["a"],
            "sources": ["x y", "z"],
            "notes": "lots of words here",
            "meta": {"origin": "web page", "count": 3}
        });
        let out = compress(payload, 1, &profile);
        assert_eq!(out.payload["sources"], json!([]));
        assert_eq!(out.payload["notes"], "");
        assert_eq!(out.payload["meta"], json!({"origin": "", "count": 3}));
        assert_eq!(out.payload["leads"], json!(["a"]));
        assert!(out.report.within);
        assert!(out.report.compressed_heavily);
    }

    #[test]
    fn arrays_never_shrink_below_floor() {
        let profile = CompressionProfile {
            primary_passes: vec![],
            global_passes: vec![],
            ..CompressionProfile::default().array_minimum("account.contacts", 2)
        };
        let payload = json!({"account": {"contacts": ["a b", "c d", "e f", "g h"]}});
        let out = compress(payload, 4, &profile);
        assert_eq!(out.payload["account"]["contacts"], json!(["a b", "c d"]));
        assert!(out.report.compressed_heavily);
        assert!(out.report.within);

        // 床まで削っても収まらなければ最後の手段で 2 語に切る
        let payload = json!({"account": {"contacts": ["a b c", "d e f", "g h i"]}});
        let out = compress(payload, 4, &profile);
        assert_eq!(out.payload["account"]["contacts"], json!(["a b", "d e"]));
        assert!(out.report.within);
    }

    #[test]
    fn word_free_tail_does_not_stop_truncation() {
        let profile = CompressionProfile {
            primary_passes: vec![],
            global_passes: vec![],
            ..CompressionProfile::default().array_minimum("list", 1)
        };
        let out = compress(json!({"list": ["a b c d", "e f g h", 7]}), 4, &profile);
        assert_eq!(out.payload["list"], json!(["a b c d"]));
        assert!(out.report.within);
        assert!(out.report.compressed_heavily);
        assert_eq!(out.report.words_after, 4);
    }

    #[test]
    fn reaching_truncation_is_heavy_even_at_floor() {
        let profile = CompressionProfile {
            primary_passes: vec![],
            global_passes: vec![],
            ..CompressionProfile::default().array_minimum("list", 1)
        };
        // 床に達していて pop できなくても、最後の手段で切った結果は heavy
        let out = compress(json!({"list": ["a b c d"]}), 2, &profile);
        assert_eq!(out.payload["list"], json!(["a b"]));
        assert!(out.report.within);
        assert!(out.report.compressed_heavily);
    }

    #[test]
    fn unreachable_target_is_heavy() {
        let payload = json!({"a": "one two three", "b": "four five six"});
        let out = compress(payload, 1, &CompressionProfile::default());
        assert!(!out.report.within);
        assert!(out.report.compressed_heavily);
        assert_eq!(out.report.words_after, 4);
    }

    #[test]
    fn never_removes_keys_and_never_grows() {
        let payload = json!({
            "account": {
                "name": "Acme Dental Group of Austin",
                "summary": "A long summary with many many words about the account and more",
                "contacts": [{"name": "Ana Diaz", "role": "office manager"}],
                "sources": ["https://example.com page one", "another source text"]
            },
            "notes": "some notes about things",
            "score": 7,
            "flags": {"verified": true}
        });
        let mut before = Vec::new();
        keys_of(&payload, "", &mut before);

        for max in [0, 1, 3, 8, 20, 100] {
            let profile = CompressionProfile::for_agent(AgentId::AccountResearcher);
            let out = compress(payload.clone(), max, &profile);
            let mut after = Vec::new();
            keys_of(&out.payload, "", &mut after);
            for key in &before {
                assert!(
                    after.contains(key) || key.starts_with("/account/contacts/"),
                    "{key} removed at max={max}"
                );
            }
            assert!(out.report.words_after <= out.report.words_before);
            if out.report.words_after > max {
                assert!(out.report.compressed_heavily);
            }
        }
    }
}
