//! Budget enforcement: input clamping before a producer runs and
//! shape-preserving compression after it returns.

pub mod compressor;
pub mod controller;

pub use compressor::{
    Compressed, CompressionProfile, CompressionReport, DEFAULT_GLOBAL_PASSES,
    DEFAULT_PRIMARY_PASSES, LAST_RESORT_WORDS, compress, count_words,
};
pub use controller::{BUDGET_CLAMPED, BudgetOutcome, BudgetPaths, apply_budget, get_path, set_path};
