//! OrchestratorBuilder - orchestrator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use super::goals::Goal;
use super::orchestrator::Orchestrator;
use crate::config::BatonConfig;
use crate::domain::AgentId;
use crate::ports::{Clock, IdGenerator, Producer, SystemClock, UlidGenerator};
use crate::typed::{ProducerInput, ProducerRegistry, RegistryError, TypedProducer};

/// OrchestratorBuilder は Orchestrator を構築
///
/// # 使用例
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .register_typed::<LeadSearch, _>(MyLeadFinder)?
///     .expect_goal(Goal::LocalDmReady)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_agents() / expect_goal() で必要な producer を宣言
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す
pub struct OrchestratorBuilder {
    registry: ProducerRegistry,
    expected_agents: Option<Vec<AgentId>>,
    config: BatonConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError は orchestrator 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing producers: {0:?}. These agents were expected but not registered.")]
    MissingAgents(Vec<AgentId>),
}

impl OrchestratorBuilder {
    /// 新しい OrchestratorBuilder を作成
    pub fn new() -> Self {
        Self {
            registry: ProducerRegistry::new(),
            expected_agents: None,
            config: BatonConfig::default(),
            clock: None,
            ids: None,
        }
    }

    /// 型付き producer を登録
    pub fn register_typed<I: ProducerInput, P: TypedProducer<I> + 'static>(
        mut self,
        producer: P,
    ) -> Result<Self, RegistryError> {
        self.registry.register_typed::<I, P>(producer)?;
        Ok(self)
    }

    /// 型消去済みの producer を登録
    pub fn register(mut self, producer: Arc<dyn Producer>) -> Result<Self, RegistryError> {
        self.registry.register(producer)?;
        Ok(self)
    }

    /// 期待される AgentId を追加
    pub fn expect_agents(mut self, agents: &[AgentId]) -> Self {
        let expected = self.expected_agents.get_or_insert_with(Vec::new);
        for &agent in agents {
            if !expected.contains(&agent) {
                expected.push(agent);
            }
        }
        self
    }

    /// goal が使う全 agent を期待集合に追加
    pub fn expect_goal(self, goal: Goal) -> Self {
        let agents = goal.agents();
        self.expect_agents(&agents)
    }

    pub fn with_config(mut self, config: BatonConfig) -> Self {
        self.config = config;
        self
    }

    /// 時計を差し替え（ID 生成器を別途指定しなければ ULID の timestamp にも使う）
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    /// OrchestratorBuilder を構築して Orchestrator を生成
    ///
    /// # 検証
    /// - 期待された agent が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingAgents を返す
    pub fn build(self) -> Result<Orchestrator, BuildError> {
        if let Some(expected) = &self.expected_agents {
            let registered = self.registry.registered_agents();
            let missing: Vec<AgentId> = expected
                .iter()
                .filter(|agent| !registered.contains(*agent))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingAgents(missing));
            }
        }

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(Orchestrator::new(self.registry, self.config, clock, ids))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
