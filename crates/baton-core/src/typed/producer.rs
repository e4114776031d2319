//! TypedProducer trait - 型付き入力を受け取る producer の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (TypedProducer<I>)
//! - Type erasure パターン (Typed<I, P> → dyn Producer)

use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;

use super::input::ProducerInput;
use crate::domain::{AgentId, ProducerError};
use crate::ports::Producer;

/// TypedProducer は型付き入力を受け取り、payload か envelope を返す
///
/// # ジェネリクスによる型安全性
/// - `TypedProducer<LeadSearch>` は `LeadSearch` しか受け取れない
/// - 入力型と AgentId の対応がコンパイル時に固定される
#[async_trait]
pub trait TypedProducer<I: ProducerInput>: Send + Sync {
    async fn produce(&self, input: I) -> Result<Value, ProducerError>;
}

/// Typed は TypedProducer<I> を object-safe な Producer に変換する
///
/// 入力 JSON のデコードに失敗した場合は `ProducerError::InvalidInput` になります。
pub struct Typed<I: ProducerInput, P: TypedProducer<I>> {
    producer: P,
    _marker: PhantomData<fn(I)>,
}

impl<I: ProducerInput, P: TypedProducer<I>> Typed<I, P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<I: ProducerInput, P: TypedProducer<I>> Producer for Typed<I, P> {
    fn agent(&self) -> AgentId {
        I::AGENT
    }

    async fn run(&self, input: Value) -> Result<Value, ProducerError> {
        let typed: I =
            serde_json::from_value(input).map_err(|e| ProducerError::InvalidInput {
                agent: I::AGENT,
                reason: format!("json decode: {e}"),
            })?;
        self.producer.produce(typed).await
    }
}
