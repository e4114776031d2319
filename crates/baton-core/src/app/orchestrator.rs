//! Orchestrator - goal を 1 ステップずつ実行し、最終 envelope を組み立てる
//!
//! # 実行フロー（ステップごと）
//! 1. 上流エンティティを compat チェック付きで入力に転送
//! 2. Budget Controller で入力を整形
//! 3. producer を実行（または事前計算された envelope を replay）
//! 4. Envelope Validator → Compressor → Handoff Builder
//! 5. Step Normalizer で次のステップ用のエンティティを抽出
//!
//! # 失敗ポリシー
//! `run` に致命的なパスは無い。互換性違反・producer エラー・スキーマ違反は
//! すべて limitation と `needsReview` として最終 envelope に残る。

use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::goals::{Edge, Goal, StepOutputs, StepSpec};
use crate::budget::{BudgetPaths, CompressionProfile, apply_budget, compress};
use crate::config::BatonConfig;
use crate::contract::{
    EnvelopeValidator, Schema, StepContext, build_handoff, normalize_step, strip_internal,
};
use crate::domain::{
    AgentId, Budget, BudgetApplied, ClampRecord, Envelope, Handoff, Meta, Mode, QualityChecks,
    StepMetaSummary, StepRecord,
};
use crate::ports::{Clock, IdGenerator};
use crate::typed::ProducerRegistry;

/// `meta.agent_id` of every run-level envelope.
pub const ORCHESTRATOR_AGENT: &str = "orchestrator";

pub const UNKNOWN_GOAL: &str = "Unknown goal";

/// Step-level warning when the compressor had to shrink an output.
pub const OUTPUT_COMPRESSED: &str = "output_compressed";

/// Orchestrator は goal を実行する
///
/// # 並行性
/// - `run(&self)` は run ごとの状態だけを持つので、独立した run を並行に実行できる
/// - producer・clock・id 生成は注入された trait object
pub struct Orchestrator {
    registry: ProducerRegistry,
    validator: EnvelopeValidator,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

/// Per-run bookkeeping. Never shared between runs.
struct RunState {
    run_id: String,
    trace_id: String,
    records: Vec<StepRecord>,
    outputs: StepOutputs,
    limitations: Vec<String>,
    assumptions: Vec<String>,
    warnings: Vec<String>,
    needs_review: bool,
    quality: QualityChecks,
    last_handoff: Option<Handoff>,
    /// Steps whose descriptor version is unsupported; every edge leaving
    /// them is a mismatch.
    unsupported: HashSet<&'static str>,
    clamped: Vec<ClampRecord>,
    all_replayed: bool,
}

impl RunState {
    fn new(run_id: String, trace_id: String) -> Self {
        Self {
            run_id,
            trace_id,
            records: Vec::new(),
            outputs: StepOutputs::new(),
            limitations: Vec::new(),
            assumptions: Vec::new(),
            warnings: Vec::new(),
            needs_review: false,
            quality: QualityChecks::default(),
            last_handoff: None,
            unsupported: HashSet::new(),
            clamped: Vec::new(),
            all_replayed: true,
        }
    }

    fn limit(&mut self, limitation: String) {
        if !self.limitations.contains(&limitation) {
            self.limitations.push(limitation);
        }
    }

    /// A limitation that also makes the run need human review.
    fn flag(&mut self, limitation: String) {
        self.needs_review = true;
        self.limit(limitation);
    }

    fn warn(&mut self, warning: String) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// What one step produced, before normalization.
struct StepResult {
    /// `{data, meta}` as JSON.
    output: Value,
    mode: Mode,
    quality: QualityChecks,
    limitations: usize,
    warnings: Vec<String>,
    /// Producer error or missing producer.
    failure: Option<String>,
    compressed_heavily: bool,
}

impl Orchestrator {
    pub(crate) fn new(
        registry: ProducerRegistry,
        config: BatonConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            registry,
            validator: EnvelopeValidator::new(config),
            clock,
            ids,
        }
    }

    pub fn config(&self) -> &BatonConfig {
        self.validator.config()
    }

    pub fn registry(&self) -> &ProducerRegistry {
        &self.registry
    }

    /// Run `goal` end to end.
    ///
    /// `inputs` maps step ids to either raw producer parameters or a
    /// pre-computed `{data, meta}` envelope to replay.
    pub async fn run(
        &self,
        goal: &str,
        inputs: &Map<String, Value>,
        budget: Option<&Budget>,
    ) -> Envelope {
        let run_id = self.ids.generate_run_id().to_string();
        let trace_id = self.ids.generate_trace_id().to_string();

        let Some(goal_id) = Goal::parse(goal) else {
            warn!(goal, run_id = %run_id, "unknown goal");
            return self.unknown_goal(goal, inputs, budget, run_id, trace_id);
        };

        info!(goal, run_id = %run_id, steps = goal_id.steps().len(), "run started");
        let mut state = RunState::new(run_id, trace_id);

        for spec in goal_id.steps() {
            let supplied = inputs.get(spec.step_id);
            if let Some(condition) = spec.condition {
                if supplied.is_none() && !condition(&state.outputs) {
                    debug!(goal, step_id = spec.step_id, "condition not met, skipping step");
                    state
                        .assumptions
                        .push(format!("step skipped: {} (condition not met)", spec.step_id));
                    continue;
                }
            }
            self.execute_step(spec, supplied, budget, &mut state).await;
        }

        let envelope = self.finish(goal_id, inputs, budget, state);
        info!(
            goal,
            run_id = %envelope.meta.run_id,
            needs_review = envelope.data["needsReview"].as_bool().unwrap_or(true),
            limitations = envelope.meta.limitations.len(),
            "run finished"
        );
        envelope
    }

    async fn execute_step(
        &self,
        spec: &StepSpec,
        supplied: Option<&Value>,
        budget: Option<&Budget>,
        state: &mut RunState,
    ) {
        let agent = spec.agent;
        let result = match supplied {
            Some(envelope) if Envelope::is_enveloped(envelope) => {
                debug!(step_id = spec.step_id, agent = %agent, "replaying supplied envelope");
                replay(envelope)
            }
            _ => self.produce(spec, supplied, budget, state).await,
        };

        let normalized = normalize_step(agent, &result.output);

        if let Some(failure) = result.failure {
            warn!(step_id = spec.step_id, agent = %agent, %failure, "step degraded");
            state.flag(failure);
        }
        if !result.quality.schema_valid {
            state.flag(format!("schema validation failed: {agent}"));
        }
        for note in &normalized.notes {
            state.limit(format!("{agent}: {note}"));
        }
        match normalized.handoff_type {
            Some(t) if normalized.inferred => {
                state.limit(format!("handoff type inferred from data shape: {agent} -> {t}"));
            }
            Some(_) => {}
            None => state.limit(format!("handoff type unresolved: {agent}")),
        }
        if !normalized.is_supported_version() {
            warn!(step_id = spec.step_id, agent = %agent, version = %normalized.handoff_version, "unsupported handoff version");
            state.flag(format!(
                "handoff version unsupported: {agent} ({})",
                normalized.handoff_version
            ));
            state.unsupported.insert(spec.step_id);
        }
        if result.compressed_heavily {
            state.flag(format!("output compressed heavily: {agent}"));
        }
        for warning in result.warnings.iter().cloned() {
            state.warn(warning);
        }

        state.quality = state.quality.and(result.quality);
        state.all_replayed &= result.mode == Mode::Replay;

        state.records.push(StepRecord {
            step_id: spec.step_id.to_string(),
            agent_id: agent,
            ok: result.quality.schema_valid,
            output_meta_summary: StepMetaSummary {
                handoff_type: normalized.handoff_type,
                mode: result.mode,
                schema_valid: result.quality.schema_valid,
                limitations: result.limitations,
                warnings: result.warnings.len(),
            },
            output_data_summary: normalized.data_summary.clone(),
        });

        if let Some(t) = normalized.handoff_type {
            let mut handoff = Handoff::new(t, normalized.entities.clone())
                .with_recommended(normalized.agent_id.recommended_next());
            handoff.version = normalized.handoff_version.clone();
            state.last_handoff = Some(handoff);
        }

        debug!(
            step_id = spec.step_id,
            agent = %agent,
            handoff_type = normalized.handoff_type.map(|t| t.as_str()).unwrap_or("none"),
            "step complete"
        );
        state.outputs.insert(spec.step_id, normalized);
    }

    async fn produce(
        &self,
        spec: &StepSpec,
        supplied: Option<&Value>,
        budget: Option<&Budget>,
        state: &mut RunState,
    ) -> StepResult {
        let agent = spec.agent;

        let mut params = match supplied {
            Some(Value::Object(obj)) => obj.clone(),
            Some(_) => {
                state.limit(format!("ignored non-object input for step: {}", spec.step_id));
                Map::new()
            }
            None => Map::new(),
        };
        for edge in spec.consumes {
            let value = forward(edge, agent, state);
            params.insert(edge.into.to_string(), value);
        }

        let mut input = Value::Object(params);
        let mut budget_applied = None;
        let mut budget_warnings = Vec::new();
        if let Some(budget) = budget.filter(|b| !b.is_unlimited()) {
            let outcome = apply_budget(input, budget, &BudgetPaths::for_agent(agent));
            input = outcome.input;
            budget_warnings = outcome.warnings;
            if !outcome.applied.is_empty() {
                state.clamped.extend(outcome.applied.clamped.iter().cloned());
                budget_applied = Some(outcome.applied);
            }
        }

        let ctx = StepContext {
            agent,
            run_id: &state.run_id,
            trace_id: &state.trace_id,
            generated_at: self.clock.now(),
            input: &input,
        };

        let mut failure = None;
        let mut envelope = match self.registry.get(agent) {
            Some(producer) => match producer.run(input.clone()).await {
                Ok(raw) => self.validator.wrap(raw, &ctx, &Schema::for_agent(agent)),
                Err(err) => {
                    let limitation = format!("producer error: {agent}: {err}");
                    failure = Some(limitation.clone());
                    self.validator.failed(&ctx, limitation)
                }
            },
            None => {
                let limitation = format!("no producer registered: {agent}");
                failure = Some(limitation.clone());
                self.validator.failed(&ctx, limitation)
            }
        };

        envelope.meta.budget_applied = budget_applied;
        for warning in budget_warnings {
            envelope.meta.push_warning(warning);
        }

        let mut compressed_heavily = false;
        if let Some(max_words) = budget.and_then(|b| b.max_words) {
            let max_words = usize::try_from(max_words).unwrap_or(usize::MAX);
            let data = std::mem::take(&mut envelope.data);
            let compressed = compress(data, max_words, &CompressionProfile::for_agent(agent));
            envelope.data = compressed.payload;
            let report = compressed.report;
            envelope.meta.quality_checks.within_limits &= report.within;
            if report.compressed {
                envelope.meta.push_warning(OUTPUT_COMPRESSED);
            }
            compressed_heavily = report.compressed_heavily;
            debug!(
                agent = %agent,
                words_before = report.words_before,
                words_after = report.words_after,
                "output compressed"
            );
        }

        envelope.meta.handoff = Some(build_handoff(agent, &envelope.data));

        StepResult {
            mode: envelope.meta.mode,
            quality: envelope.meta.quality_checks,
            limitations: envelope.meta.limitations.len(),
            warnings: envelope.meta.warnings().to_vec(),
            output: envelope.to_value(),
            failure,
            compressed_heavily,
        }
    }

    fn finish(
        &self,
        goal: Goal,
        inputs: &Map<String, Value>,
        budget: Option<&Budget>,
        mut state: RunState,
    ) -> Envelope {
        let final_payload = goal.assemble_final(&state.outputs);
        let handoff = state
            .last_handoff
            .take()
            .unwrap_or_else(|| goal.synthetic_handoff(&final_payload));

        let live = self.config().llm_live();
        let mut quality = state.quality;
        quality.llm_connected = live;

        let mode = if state.all_replayed && !state.records.is_empty() {
            Mode::Replay
        } else if live {
            Mode::Live
        } else {
            Mode::Offline
        };

        let mut meta = Meta::new(
            ORCHESTRATOR_AGENT,
            self.clock.now(),
            state.run_id,
            state.trace_id,
            mode,
        );
        meta.input_echo = self.input_echo(goal.as_str(), inputs, budget);
        meta.quality_checks = quality;
        meta.limitations = state.limitations;
        meta.assumptions = state.assumptions;
        meta.warnings = (!state.warnings.is_empty()).then_some(state.warnings);
        meta.handoff = Some(handoff);
        meta.budget_applied = budget.map(|b| BudgetApplied {
            max_web_requests: b.max_web_requests,
            max_items: b.max_items,
            max_words: b.max_words,
            clamped: state.clamped,
        });

        let data = json!({
            "steps": state.records,
            "final": final_payload,
            "needsReview": state.needs_review,
        });
        Envelope::new(data, meta)
    }

    fn unknown_goal(
        &self,
        goal: &str,
        inputs: &Map<String, Value>,
        budget: Option<&Budget>,
        run_id: String,
        trace_id: String,
    ) -> Envelope {
        let live = self.config().llm_live();
        let mode = if live { Mode::Live } else { Mode::Offline };
        let mut meta = Meta::new(ORCHESTRATOR_AGENT, self.clock.now(), run_id, trace_id, mode);
        meta.input_echo = self.input_echo(goal, inputs, budget);
        meta.quality_checks.llm_connected = live;
        meta.push_limitation(UNKNOWN_GOAL);

        let data = json!({"steps": [], "final": null, "needsReview": true});
        Envelope::new(data, meta)
    }

    fn input_echo(&self, goal: &str, inputs: &Map<String, Value>, budget: Option<&Budget>) -> Value {
        let echo = json!({"goal": goal, "inputs": inputs, "budget": budget});
        strip_internal(&echo, &self.config().internal_prefix)
    }
}

/// Upstream entity for `edge`, or null when the upstream step did not run or
/// its output may not flow into `consumer`.
fn forward(edge: &Edge, consumer: AgentId, state: &mut RunState) -> Value {
    let (producer, compatible, value) = match state.outputs.get(edge.from) {
        None => return Value::Null,
        Some(upstream) => (
            upstream.agent_id,
            !state.unsupported.contains(edge.from) && upstream.accepts(consumer),
            upstream.entity(edge.entity).cloned().unwrap_or(Value::Null),
        ),
    };

    if !compatible {
        warn!(from = edge.from, producer = %producer, consumer = %consumer, "handoff format mismatch");
        state.flag(format!("handoff format mismatch: {producer} -> {consumer}"));
        return Value::Null;
    }
    value
}

/// A caller-supplied envelope is trusted as is: no validation, no new handoff.
fn replay(envelope: &Value) -> StepResult {
    let meta = envelope.get("meta");
    let quality = meta
        .and_then(|m| m.get("quality_checks"))
        .and_then(|q| serde_json::from_value::<QualityChecks>(q.clone()).ok())
        .unwrap_or_default();
    let count = |key: &str| {
        meta.and_then(|m| m.get(key))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    };
    let warnings = meta
        .and_then(|m| m.get("warnings"))
        .and_then(Value::as_array)
        .map(|w| w.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    StepResult {
        output: envelope.clone(),
        mode: Mode::Replay,
        quality,
        limitations: count("limitations"),
        warnings,
        failure: None,
        compressed_heavily: false,
    }
}
