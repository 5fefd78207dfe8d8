//! Shared data types: tokens, patterns, configuration knobs, and result shapes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A single normalized token produced by the tokenizer.
///
/// `original_index` is the token's ordinal position among the raw splits of
/// the source string (before any drop/merge pass), used to reconstruct
/// order-preserving multi-segment patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub original_index: usize,
}

/// Raw-split strategy used by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Split on transitions between alphabetic / digit / other character classes.
    ClassChange,
    /// Every character is its own raw token. Implicitly forces `min_token_len = 1`.
    Char,
}

impl Default for SplitMethod {
    fn default() -> Self {
        SplitMethod::ClassChange
    }
}

/// Per-field (or global) tokenizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub split_method: SplitMethod,
    pub min_token_len: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        TokenizerConfig {
            split_method: SplitMethod::ClassChange,
            min_token_len: 1,
        }
    }
}

/// Quality mode: EXACT forces `max_fp = 0`; APPROX leaves `max_fp` unconstrained
/// unless explicitly set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Exact,
    Approx,
}

/// How much search effort the solver is permitted to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
    Exhaustive,
}

/// Inversion policy for the greedy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invert {
    Auto,
    Never,
    Always,
}

/// Pattern shape, gating which generation rule produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Exact,
    Prefix,
    Suffix,
    Substring,
    Multi,
}

impl PatternKind {
    /// Base scoring multiplier from `spec.md` §4.3. `Multi` has no fixed
    /// multiplier here; its score is the sum of segment lengths, computed by
    /// the caller.
    pub fn score_multiplier(self) -> f64 {
        match self {
            PatternKind::Exact => 2.0,
            PatternKind::Prefix => 1.5,
            PatternKind::Suffix => 1.5,
            PatternKind::Substring => 1.0,
            PatternKind::Multi => 1.0,
        }
    }
}

/// A scalar value that may be given uniformly or per field.
///
/// See `spec.md` §9 design note: avoid "sometimes a number, sometimes an
/// object" typing by resolving lookups through one small tagged variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weights<T> {
    Uniform(T),
    PerField(HashMap<String, T>),
}

impl<T: Copy> Weights<T> {
    /// Resolve the weight for an optional field name. Single-field mode
    /// passes `None`. A `PerField` map missing an entry falls back to
    /// `default_value`.
    pub fn resolve(&self, field: Option<&str>, default_value: T) -> T {
        match self {
            Weights::Uniform(v) => *v,
            Weights::PerField(map) => field
                .and_then(|f| map.get(f))
                .copied()
                .unwrap_or(default_value),
        }
    }
}

impl<T> Default for Weights<T>
where
    T: Default,
{
    fn default() -> Self {
        Weights::Uniform(T::default())
    }
}

/// A hard budget: absolute count, fraction of total, or unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Budget {
    None,
    Count(usize),
    Fraction(f64),
}

impl Default for Budget {
    fn default() -> Self {
        Budget::None
    }
}

impl Budget {
    /// Resolve against a total (e.g. `|include|`). `Count(0)` and
    /// `Fraction(0.0)` both mean "exactly zero allowed".
    pub fn resolve(&self, total: usize) -> Option<usize> {
        match self {
            Budget::None => None,
            Budget::Count(n) => Some(*n),
            Budget::Fraction(f) => Some((*f * total as f64).ceil() as usize),
        }
    }
}

/// Soft cost weights driving the greedy selector (`spec.md` §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostWeights {
    pub w_fp: Weights<f64>,
    pub w_fn: Weights<f64>,
    pub w_pattern: f64,
    pub w_op: f64,
    pub w_wc: f64,
    pub w_len: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            w_fp: Weights::Uniform(1.0),
            w_fn: Weights::Uniform(1.0),
            w_pattern: 0.05,
            w_op: 0.02,
            w_wc: 0.01,
            w_len: 0.001,
        }
    }
}

/// Hard budgets constraining the greedy selector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budgets {
    pub max_patterns: Budget,
    pub max_fp: Budget,
    pub max_fn: Budget,
}

/// A structured-mode row: field name to value, `None` meaning "don't care"
/// (only meaningful on exclude rows). `BTreeMap` keeps field iteration order
/// deterministic, which the structured solver's raw expression text depends on.
pub type Row = BTreeMap<String, Option<String>>;

/// One emitted pattern in the final solution (`spec.md` §3 "Pattern").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub text: String,
    pub kind: PatternKind,
    pub wildcards: usize,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub score: f64,
    pub matches: usize,
    pub fp: usize,
}

/// Aggregate coverage counts for a solution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub covered: usize,
    pub total_positive: usize,
    pub fp: usize,
    pub fn_: usize,
    pub total_negative: usize,
}

/// Bounded example samples by category, for explanation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Witnesses {
    pub tp_examples: Vec<String>,
    pub fp_examples: Vec<String>,
    pub fn_examples: Vec<String>,
}

/// One conjunction in a structured-mode solution: one pattern per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub fields: BTreeMap<String, Pattern>,
    pub matches: usize,
    pub fp: usize,
    pub fn_: usize,
    pub incremental_matches: usize,
    pub incremental_fp: usize,
    pub length: usize,
}

/// Visibility into candidate-pool truncation (`spec.md` §7.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub candidates_generated: usize,
    pub candidates_retained: usize,
    pub truncated: bool,
}

/// Final solver output (`spec.md` §6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub expr: String,
    pub raw_expr: String,
    pub patterns: Vec<Pattern>,
    pub metrics: Metrics,
    pub witnesses: Witnesses,
    pub global_inverted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<Term>,
    pub diagnostics: Diagnostics,
}

pub(crate) const WITNESS_SAMPLE_CAP: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_resolve_uniform() {
        let w: Weights<f64> = Weights::Uniform(2.5);
        assert_eq!(w.resolve(None, 1.0), 2.5);
        assert_eq!(w.resolve(Some("f"), 1.0), 2.5);
    }

    #[test]
    fn weights_resolve_per_field_fallback() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 3.0);
        let w = Weights::PerField(map);
        assert_eq!(w.resolve(Some("a"), 1.0), 3.0);
        assert_eq!(w.resolve(Some("b"), 1.0), 1.0);
        assert_eq!(w.resolve(None, 1.0), 1.0);
    }

    #[test]
    fn budget_resolve_variants() {
        assert_eq!(Budget::None.resolve(10), None);
        assert_eq!(Budget::Count(0).resolve(10), Some(0));
        assert_eq!(Budget::Fraction(0.5).resolve(10), Some(5));
        assert_eq!(Budget::Fraction(0.01).resolve(10), Some(1));
    }
}
