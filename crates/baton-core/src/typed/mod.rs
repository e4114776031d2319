//! Typed - 型付き producer API
//!
//! AgentId の typo を型で排除し、入力型と producer の対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `ProducerInput` trait, `TypedProducer<I>` trait - 型安全
//! - **内部（Dyn）**: `ports::Producer` trait - object-safe, type erasure

pub mod input;
pub mod producer;
pub mod registry;

pub use self::input::ProducerInput;
pub use self::producer::{Typed, TypedProducer};
pub use self::registry::{ProducerRegistry, RegistryError};
