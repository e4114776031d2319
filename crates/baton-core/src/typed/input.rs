//! ProducerInput trait - 型付き producer 入力の定義
//!
//! # 学習ポイント
//! - Associated Constants (`const AGENT`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::AgentId;

/// ProducerInput は入力型と producer の識別子を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct LeadSearch {
///     query: String,
///     max_results: u64,
/// }
///
/// impl ProducerInput for LeadSearch {
///     const AGENT: AgentId = AgentId::LocalLeadFinder;
/// }
/// ```
///
/// 予算制御と上流 entity の注入は JSON 上で行われるため、
/// 入力型は orchestrator が書き込むキー（`leads`, `max_results` など）を
/// フィールドとして受け取れるようにしておきます。
pub trait ProducerInput: Serialize + DeserializeOwned + Send + Sync + 'static {
    const AGENT: AgentId;
}
