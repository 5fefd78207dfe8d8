//! # patternforge
//!
//! Discovers concise boolean glob-pattern expressions that separate an
//! include set of strings (or structured, multi-field rows) from an
//! exclude set, with bounded false positives/negatives under a
//! configurable cost model.
//!
//! ## Example
//!
//! ```
//! use patternforge::{Solver, SolverConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let solver = Solver::new(SolverConfig::default())?;
//! let include = vec!["cache/bank0", "cache/bank1"];
//! let exclude = vec!["core/fetch"];
//! let solution = solver.solve(&include, &exclude)?;
//! println!("{}", solution.expr);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`glob`]: the `*`-only glob matcher
//! - [`tokenizer`]: deterministic string segmentation
//! - [`candidate`]: candidate pattern generation and scoring
//! - [`coverage`]: per-candidate include/exclude hit masks
//! - [`selector`]: greedy, budget-aware set cover
//! - [`expand`]: literal-anchor specialization
//! - [`refine`]: pairwise pattern merging
//! - [`structured`]: multi-field conjunctive solving
//! - [`boolean`]: boolean expression grammar and evaluator
//! - [`config`]: configuration and validation
//! - [`solver`]: top-level orchestration

pub mod bitset;
pub mod boolean;
pub mod candidate;
pub mod config;
pub mod coverage;
pub mod expand;
pub mod glob;
pub mod invariants;
pub mod refine;
pub mod selector;
pub mod solver;
pub mod structured;
pub mod tokenizer;
pub mod types;

pub use config::SolverConfig;
pub use solver::{solve, Solver};
pub use types::{
    Budget, Budgets, CostWeights, Diagnostics, Effort, Invert, Metrics, Mode, Pattern, PatternKind,
    Row, SplitMethod, Solution, Term, TokenizerConfig, Weights, Witnesses,
};

/// Maximum input string size, in bytes, accepted by a single include/exclude
/// item. Guards against pathological inputs driving unbounded tokenization
/// or candidate generation work.
pub const MAX_INPUT_SIZE: usize = 10 * 1024 * 1024;

/// Maximum number of include or exclude items accepted in one `solve` call.
pub const MAX_ROWS: usize = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `SolverConfig` failed validation before any solving work began.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Input data (include/exclude sets or rows) violated a precondition.
    #[error("invalid input: {0}")]
    Input(String),

    /// A boolean expression failed to parse.
    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },
}
