//! App - アプリケーション層
//!
//! このモジュールは、contract / budget / ports を組み合わせて goal を実行します。
//!
//! # 主要コンポーネント
//! - **OrchestratorBuilder**: producer の登録と起動時検証
//! - **Orchestrator**: goal をステップ単位で実行し、最終 envelope を組み立てる
//! - **Goal**: 名前付きワークフローの静的定義

pub mod builder;
pub mod goals;
pub mod orchestrator;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, OrchestratorBuilder};
pub use self::goals::{Edge, Goal, StepOutputs, StepSpec};
pub use self::orchestrator::{ORCHESTRATOR_AGENT, OUTPUT_COMPRESSED, Orchestrator, UNKNOWN_GOAL};
