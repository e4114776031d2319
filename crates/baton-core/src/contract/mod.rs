//! Contract - ステップ間の受け渡し契約
//!
//! # 主要コンポーネント
//! - **EnvelopeValidator**: 生の出力を `{data, meta}` に包み、スキーマと品質フラグを確定
//! - **build_handoff**: producer の出力から型付き handoff 記述子を生成
//! - **normalize_step**: 新旧どの形の出力からも正規化エンティティを抽出

pub mod extract;
pub mod handoff_builder;
pub mod normalizer;
pub mod schema;
pub mod validator;

pub use extract::{data_summary, entities_for, strip_internal};
pub use handoff_builder::build_handoff;
pub use normalizer::{
    DataShape, NormalizedStep, SHAPE_PRECEDENCE, infer_handoff_type, normalize_step, split_output,
};
pub use schema::{FieldRule, Schema};
pub use validator::{EnvelopeValidator, LEGACY_QUALITY_FLAGS, StepContext};
