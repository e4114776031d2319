//! ProducerRegistry - producer の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権（並行する run から同じ producer を参照する）

use std::collections::HashMap;
use std::sync::Arc;

use super::input::ProducerInput;
use super::producer::{Typed, TypedProducer};
use crate::domain::AgentId;
use crate::ports::Producer;

/// ProducerRegistry は AgentId ごとに producer を 1 つ保持する
///
/// # 使用例
/// ```ignore
/// let mut registry = ProducerRegistry::new();
/// registry.register_typed::<LeadSearch, _>(MyLeadFinder)?;
/// let producer = registry.get(AgentId::LocalLeadFinder);
/// ```
///
/// # 設計
/// - 初期化時に構築（mutable）
/// - 実行時は読み取り専用（ロック不要）
#[derive(Default)]
pub struct ProducerRegistry {
    producers: HashMap<AgentId, Arc<dyn Producer>>,
}

/// RegistryError は ProducerRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("producer for agent '{0}' is already registered")]
    AlreadyRegistered(AgentId),
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self {
            producers: HashMap::new(),
        }
    }

    /// 型付き producer を登録（AgentId は入力型から決まる）
    pub fn register_typed<I: ProducerInput, P: TypedProducer<I> + 'static>(
        &mut self,
        producer: P,
    ) -> Result<(), RegistryError> {
        self.register(Arc::new(Typed::<I, P>::new(producer)))
    }

    /// 型消去済みの producer を登録（AgentId は producer 自身が名乗る）
    pub fn register(&mut self, producer: Arc<dyn Producer>) -> Result<(), RegistryError> {
        let agent = producer.agent();
        if self.producers.contains_key(&agent) {
            return Err(RegistryError::AlreadyRegistered(agent));
        }
        self.producers.insert(agent, producer);
        Ok(())
    }

    pub fn get(&self, agent: AgentId) -> Option<Arc<dyn Producer>> {
        self.producers.get(&agent).cloned()
    }

    /// 登録済みの AgentId（順序は AgentId の定義順）
    pub fn registered_agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> = self.producers.keys().copied().collect();
        agents.sort();
        agents
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}
