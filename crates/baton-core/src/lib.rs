//! baton-core
//!
//! Pipeline orchestration and handoff contracts for chaining independent
//! producers.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, agent, handoff, envelope, budget, step, errors）
//! - **ports**: 抽象化レイヤー（Producer, Clock, IdGenerator）
//! - **contract**: 受け渡し契約（EnvelopeValidator, build_handoff, normalize_step, Schema）
//! - **budget**: 予算の適用（apply_budget）と形を保つ圧縮（compress）
//! - **app**: アプリケーションロジック（Orchestrator, OrchestratorBuilder, Goal）
//! - **typed**: 型付き producer API（ProducerInput, TypedProducer, ProducerRegistry）
//! - **impls**: 実装（FnProducer）
//! - **config**: 実行時設定（BatonConfig）

pub mod app;
pub mod budget;
pub mod config;
pub mod contract;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{BuildError, Goal, Orchestrator, OrchestratorBuilder};
pub use config::{BatonConfig, ConfigError, InferenceBackend};
pub use domain::{AgentId, Budget, Envelope, HandoffType, ProducerError};
