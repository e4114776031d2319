//! Envelope Validator: raw producer result -> `{data, meta}` envelope.
//!
//! Schema violations never raise. They end up as `schema_valid = false` plus
//! one `schema: <error>` limitation each, and the orchestrator decides what
//! to do with the step.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::extract::strip_internal;
use super::schema::Schema;
use crate::config::BatonConfig;
use crate::domain::{AgentId, Envelope, Meta, Mode, QualityChecks};

/// Older producers report some flags under different names.
pub const LEGACY_QUALITY_FLAGS: [(&str, &str); 4] = [
    ("within_max_words", "within_limits"),
    ("no_duplicates", "dedupe_ok"),
    ("grounded", "grounding_ok"),
    ("no_hallucination", "no_fabrication"),
];

/// Identity the orchestrator stamps on every envelope it wraps.
#[derive(Debug, Clone)]
pub struct StepContext<'a> {
    pub agent: AgentId,
    pub run_id: &'a str,
    pub trace_id: &'a str,
    pub generated_at: DateTime<Utc>,
    /// The input the producer was called with.
    pub input: &'a Value,
}

#[derive(Debug, Clone)]
pub struct EnvelopeValidator {
    config: BatonConfig,
}

impl EnvelopeValidator {
    pub fn new(config: BatonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatonConfig {
        &self.config
    }

    /// Wrap `raw` (bare payload or `{data, meta}`) and check it against `schema`.
    pub fn wrap(&self, raw: Value, ctx: &StepContext<'_>, schema: &Schema) -> Envelope {
        let (data, producer_meta) = split_raw(raw);
        let errors = schema.validate(&data);

        let mut quality = merge_quality(producer_meta.as_ref());
        quality.schema_valid = errors.is_empty();
        let claimed = claimed_flag(producer_meta.as_ref(), "llm_connected").unwrap_or(true);
        quality.llm_connected = claimed && self.config.llm_live();

        let mode = if quality.llm_connected {
            Mode::Live
        } else {
            Mode::Offline
        };
        let mut meta = self.base_meta(ctx, mode);
        meta.quality_checks = quality;

        if let Some(pm) = &producer_meta {
            merge_producer_meta(&mut meta, pm);
        }
        for error in errors {
            meta.push_limitation(format!("schema: {error}"));
        }

        Envelope::new(data, meta)
    }

    /// Envelope for a step whose producer returned nothing usable.
    pub fn failed(&self, ctx: &StepContext<'_>, limitation: impl Into<String>) -> Envelope {
        let mut meta = self.base_meta(ctx, Mode::Offline);
        meta.quality_checks.schema_valid = false;
        meta.push_limitation(limitation);
        Envelope::new(Value::Object(Map::new()), meta)
    }

    fn base_meta(&self, ctx: &StepContext<'_>, mode: Mode) -> Meta {
        let mut meta = Meta::new(
            ctx.agent.as_str(),
            ctx.generated_at,
            ctx.run_id,
            ctx.trace_id,
            mode,
        );
        meta.input_echo = strip_internal(ctx.input, &self.config.internal_prefix);
        meta
    }
}

fn split_raw(raw: Value) -> (Value, Option<Map<String, Value>>) {
    match raw {
        Value::Object(mut obj) if obj.contains_key("data") && obj.contains_key("meta") => {
            let data = obj.remove("data").unwrap_or(Value::Null);
            let meta = match obj.remove("meta") {
                Some(Value::Object(m)) => Some(m),
                _ => None,
            };
            (data, meta)
        }
        other => (other, None),
    }
}

/// A boolean flag as the producer reported it, under its canonical name or
/// any legacy alias, looked up in `quality_checks` first and then in `meta`.
fn claimed_flag(meta: Option<&Map<String, Value>>, canonical: &str) -> Option<bool> {
    let meta = meta?;
    let aliases = std::iter::once(canonical).chain(
        LEGACY_QUALITY_FLAGS
            .iter()
            .filter(|(_, to)| *to == canonical)
            .map(|(from, _)| *from),
    );
    let sources = [
        meta.get("quality_checks").and_then(Value::as_object),
        Some(meta),
    ];

    for source in sources.into_iter().flatten() {
        for name in aliases.clone() {
            if let Some(flag) = source.get(name).and_then(Value::as_bool) {
                return Some(flag);
            }
        }
    }
    None
}

/// Converge producer flags on the canonical set. Flags nobody reported
/// default to true; `schema_valid` and `llm_connected` are decided by the
/// validator.
fn merge_quality(meta: Option<&Map<String, Value>>) -> QualityChecks {
    let flag = |name: &str| claimed_flag(meta, name).unwrap_or(true);
    QualityChecks {
        no_fabrication: flag("no_fabrication"),
        within_limits: flag("within_limits"),
        dedupe_ok: flag("dedupe_ok"),
        grounding_ok: flag("grounding_ok"),
        schema_valid: true,
        llm_connected: false,
    }
}

fn merge_producer_meta(meta: &mut Meta, producer: &Map<String, Value>) {
    for limitation in strings_at(producer, "limitations") {
        meta.push_limitation(limitation);
    }
    meta.assumptions.extend(strings_at(producer, "assumptions"));
    for warning in strings_at(producer, "warnings") {
        meta.push_warning(warning);
    }
    if let Some(items) = producer.get("knowledge_used").and_then(Value::as_array) {
        meta.knowledge_used.extend(items.iter().cloned());
    }
    if let Some(stats) = producer.get("web_stats").filter(|v| !v.is_null()) {
        meta.web_stats = Some(stats.clone());
    }
}

fn strings_at(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceBackend;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn live_config() -> BatonConfig {
        BatonConfig {
            inference_backend: InferenceBackend::Remote("anthropic".into()),
            has_credentials: true,
            ..BatonConfig::default()
        }
    }

    fn wrap_with(config: BatonConfig, raw: Value, input: &Value) -> Envelope {
        let ctx = StepContext {
            agent: AgentId::LocalLeadFinder,
            run_id: "run-1",
            trace_id: "trace-1",
            generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            input,
        };
        EnvelopeValidator::new(config).wrap(raw, &ctx, &Schema::for_agent(ctx.agent))
    }

    #[test]
    fn wraps_bare_payload() {
        let env = wrap_with(BatonConfig::default(), json!({"leads": []}), &json!({}));
        assert_eq!(env.data, json!({"leads": []}));
        assert_eq!(env.meta.agent_id, "local_lead_finder");
        assert_eq!(env.meta.run_id, "run-1");
        assert_eq!(env.meta.mode, Mode::Offline);
        assert!(env.meta.quality_checks.schema_valid);
        assert!(env.meta.limitations.is_empty());
    }

    #[test]
    fn schema_errors_become_limitations() {
        let env = wrap_with(BatonConfig::default(), json!({"leads": "none"}), &json!({}));
        assert!(!env.meta.quality_checks.schema_valid);
        assert_eq!(
            env.meta.limitations,
            vec!["schema: key `leads` must be array, got string".to_string()]
        );
    }

    #[rstest]
    #[case::within_max_words("within_max_words", "within_limits")]
    #[case::no_duplicates("no_duplicates", "dedupe_ok")]
    #[case::grounded("grounded", "grounding_ok")]
    #[case::no_hallucination("no_hallucination", "no_fabrication")]
    fn legacy_flags_map_to_canonical(#[case] legacy: &str, #[case] canonical: &str) {
        let mut flags = Map::new();
        flags.insert(legacy.to_string(), json!(false));
        let raw = json!({
            "data": {"leads": []},
            "meta": {"quality_checks": flags}
        });
        let env = wrap_with(BatonConfig::default(), raw, &json!({}));
        let flags = serde_json::to_value(env.meta.quality_checks).unwrap();
        assert_eq!(flags[canonical], false);
        for other in ["no_fabrication", "within_limits", "dedupe_ok", "grounding_ok"] {
            if other != canonical {
                assert_eq!(flags[other], true, "{other}");
            }
        }
    }

    #[test]
    fn canonical_flag_wins_over_legacy() {
        let raw = json!({
            "data": {"leads": []},
            "meta": {"quality_checks": {"within_limits": true, "within_max_words": false}}
        });
        let env = wrap_with(BatonConfig::default(), raw, &json!({}));
        assert!(env.meta.quality_checks.within_limits);
    }

    #[rstest]
    #[case::offline_claims_true(BatonConfig::default(), Some(true), false)]
    #[case::offline_silent(BatonConfig::default(), None, false)]
    #[case::live_silent(live_config(), None, true)]
    #[case::live_claims_true(live_config(), Some(true), true)]
    #[case::live_reports_false(live_config(), Some(false), false)]
    fn llm_connected_needs_live_backend(
        #[case] config: BatonConfig,
        #[case] claim: Option<bool>,
        #[case] expected: bool,
    ) {
        let mut meta = json!({});
        if let Some(claim) = claim {
            meta["quality_checks"] = json!({"llm_connected": claim});
        }
        let env = wrap_with(config, json!({"data": {"leads": []}, "meta": meta}), &json!({}));
        assert_eq!(env.meta.quality_checks.llm_connected, expected);
        let mode = if expected { Mode::Live } else { Mode::Offline };
        assert_eq!(env.meta.mode, mode);
    }

    #[test]
    fn identity_comes_from_orchestrator_and_meta_is_merged() {
        let raw = json!({
            "data": {"leads": [1]},
            "meta": {
                "agent_id": "impostor",
                "run_id": "run-other",
                "limitations": ["only 1 page fetched"],
                "assumptions": ["city = Austin"],
                "warnings": ["slow source", "slow source"],
                "knowledge_used": [{"doc": "icp"}],
                "web_stats": {"requests": 2}
            }
        });
        let env = wrap_with(BatonConfig::default(), raw, &json!({}));
        assert_eq!(env.meta.agent_id, "local_lead_finder");
        assert_eq!(env.meta.run_id, "run-1");
        assert_eq!(env.meta.limitations, vec!["only 1 page fetched".to_string()]);
        assert_eq!(env.meta.assumptions, vec!["city = Austin".to_string()]);
        assert_eq!(env.meta.warnings(), ["slow source".to_string()]);
        assert_eq!(env.meta.knowledge_used, vec![json!({"doc": "icp"})]);
        assert_eq!(env.meta.web_stats, Some(json!({"requests": 2})));
    }

    #[test]
    fn input_echo_drops_internal_fields() {
        let input = json!({"city": "Austin", "__system_prompt": "x", "opts": {"__k": 1}});
        let env = wrap_with(BatonConfig::default(), json!({"leads": []}), &input);
        assert_eq!(env.meta.input_echo, json!({"city": "Austin", "opts": {}}));

        let custom = BatonConfig {
            internal_prefix: "_x_".into(),
            ..BatonConfig::default()
        };
        let env = wrap_with(custom, json!({"leads": []}), &json!({"_x_a": 1, "__b": 2}));
        assert_eq!(env.meta.input_echo, json!({"__b": 2}));
    }

    #[test]
    fn failed_envelope_is_schema_invalid() {
        let input = json!({});
        let ctx = StepContext {
            agent: AgentId::OutreachWriter,
            run_id: "run-1",
            trace_id: "trace-1",
            generated_at: Utc::now(),
            input: &input,
        };
        let env = EnvelopeValidator::new(BatonConfig::default())
            .failed(&ctx, "producer error: outreach_writer: boom");
        assert_eq!(env.data, json!({}));
        assert!(!env.meta.quality_checks.schema_valid);
        assert_eq!(env.meta.limitations.len(), 1);
    }
}
