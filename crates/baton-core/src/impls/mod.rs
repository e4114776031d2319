//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FnProducer**: 関数を Producer として登録するためのアダプタ

pub mod fn_producer;

pub use self::fn_producer::FnProducer;
