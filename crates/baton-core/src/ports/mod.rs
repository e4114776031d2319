//! Ports - 抽象化レイヤー
//!
//! 外部の producer、時刻、ID 生成を trait として注入し、
//! orchestrator の run を独立にテストできるようにします。

pub mod clock;
pub mod id_generator;
pub mod producer;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::producer::Producer;
