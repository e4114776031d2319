//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{RunId, TraceId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は run / trace の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（並行する run から共有される）
pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;

    fn generate_trace_id(&self) -> TraceId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使うと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_run_id(&self) -> RunId {
        RunId::from(self.next_ulid())
    }

    fn generate_trace_id(&self) -> TraceId {
        TraceId::from(self.next_ulid())
    }
}
