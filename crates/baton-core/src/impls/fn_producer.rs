//! FnProducer - wraps a plain function as a producer.
//!
//! Handy for wiring runner functions that already exist and for tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{AgentId, ProducerError};
use crate::ports::Producer;

pub struct FnProducer<F> {
    agent: AgentId,
    f: F,
}

impl<F> FnProducer<F>
where
    F: Fn(Value) -> Result<Value, ProducerError> + Send + Sync,
{
    pub fn new(agent: AgentId, f: F) -> Self {
        Self { agent, f }
    }
}

#[async_trait]
impl<F> Producer for FnProducer<F>
where
    F: Fn(Value) -> Result<Value, ProducerError> + Send + Sync,
{
    fn agent(&self) -> AgentId {
        self.agent
    }

    async fn run(&self, input: Value) -> Result<Value, ProducerError> {
        (self.f)(input)
    }
}
