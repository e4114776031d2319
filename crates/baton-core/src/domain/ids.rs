//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom Type
//! run と trace の識別子は ULID (Universally Unique Lexicographically Sortable Identifier) を使用します。
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わないマーカー型として、コンパイル時の型安全性を提供します。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//! - **分散生成可能**: 並行する run 同士で調整なしに生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"run-", "trace-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しません。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Run のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Trace のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trace {}

impl IdMarker for Trace {
    fn prefix() -> &'static str {
        "trace-"
    }
}

/// Identifier of one orchestrator run (shared by every step envelope of the run).
pub type RunId = Id<Run>;

/// Identifier correlating one envelope with the logs that produced it.
pub type TraceId = Id<Trace>;
