//! Solver configuration and validation (`spec.md` §4.12).
//!
//! A plain struct plus a `validate` pass run once before any pipeline work,
//! so malformed configuration never silently degrades into an empty or
//! partial solution.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Budget, Budgets, CostWeights, Effort, Invert, Mode, PatternKind, TokenizerConfig, Weights};

/// Generation-time, per-field scoring multiplier (`spec.md` §4.3/§4.13
/// "`w_field` multiplies candidate scores at generation time", distinct
/// from the per-field `w_fp`/`w_fn` selection-time cost weights in
/// `CostWeights`).
pub type FieldWeights = Weights<f64>;
use crate::Error;

/// Top-level solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub mode: Mode,
    pub effort: Effort,
    pub tokenizer: TokenizerConfig,
    pub weights: CostWeights,
    pub budgets: Budgets,
    pub invert: Invert,
    pub allowed_patterns: HashSet<PatternKind>,
    pub max_candidates: usize,
    pub per_word_substrings: usize,
    pub max_multi_segments: usize,
    pub field_weights: FieldWeights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            mode: Mode::Approx,
            effort: Effort::Medium,
            tokenizer: TokenizerConfig::default(),
            weights: CostWeights::default(),
            budgets: Budgets::default(),
            invert: Invert::Auto,
            allowed_patterns: [
                PatternKind::Exact,
                PatternKind::Prefix,
                PatternKind::Suffix,
                PatternKind::Substring,
                PatternKind::Multi,
            ]
            .into_iter()
            .collect(),
            max_candidates: 4000,
            per_word_substrings: usize::MAX,
            max_multi_segments: 4,
            field_weights: Weights::Uniform(1.0),
        }
    }
}

impl SolverConfig {
    /// Validate and normalize this configuration. `EXACT` mode forces
    /// `budgets.max_fp = Budget::Count(0)`; an explicit conflicting value is
    /// a configuration error rather than a silent override.
    pub fn validate(&mut self) -> Result<(), Error> {
        if self.allowed_patterns.is_empty() {
            return Err(Error::Config("allowed_patterns must not be empty".to_string()));
        }

        if self.tokenizer.min_token_len == 0 {
            return Err(Error::Config("tokenizer.min_token_len must be >= 1".to_string()));
        }

        check_weight(&self.weights.w_fp, "w_fp")?;
        check_weight(&self.weights.w_fn, "w_fn")?;
        check_weight(&self.field_weights, "field_weights")?;
        if self.weights.w_pattern < 0.0 || self.weights.w_op < 0.0 || self.weights.w_wc < 0.0 || self.weights.w_len < 0.0 {
            return Err(Error::Config("cost weights must be non-negative".to_string()));
        }

        check_budget_fraction(&self.budgets.max_patterns, "max_patterns")?;
        check_budget_fraction(&self.budgets.max_fp, "max_fp")?;
        check_budget_fraction(&self.budgets.max_fn, "max_fn")?;

        if self.budgets.max_patterns == Budget::Count(0) {
            return Err(Error::Config(
                "max_patterns = 0 can never be satisfied by a non-empty include set".to_string(),
            ));
        }

        match self.mode {
            Mode::Exact => match self.budgets.max_fp {
                Budget::None => self.budgets.max_fp = Budget::Count(0),
                Budget::Count(0) => {}
                _ => {
                    return Err(Error::Config(
                        "EXACT mode requires max_fp = 0; an explicit non-zero max_fp was also given".to_string(),
                    ))
                }
            },
            Mode::Approx => {}
        }

        Ok(())
    }
}

fn check_weight(w: &Weights<f64>, name: &str) -> Result<(), Error> {
    match w {
        Weights::Uniform(v) => {
            if *v < 0.0 {
                return Err(Error::Config(format!("{name} must be non-negative")));
            }
        }
        Weights::PerField(map) => {
            for v in map.values() {
                if *v < 0.0 {
                    return Err(Error::Config(format!("{name} must be non-negative")));
                }
            }
        }
    }
    Ok(())
}

fn check_budget_fraction(b: &Budget, name: &str) -> Result<(), Error> {
    if let Budget::Fraction(f) = b {
        if !(*f > 0.0 && *f <= 1.0) {
            return Err(Error::Config(format!("{name} fraction must be in (0, 1]")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let mut cfg = SolverConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn exact_mode_forces_zero_fp_budget() {
        let mut cfg = SolverConfig::default();
        cfg.mode = Mode::Exact;
        cfg.validate().unwrap();
        assert_eq!(cfg.budgets.max_fp, Budget::Count(0));
    }

    #[test]
    fn exact_mode_rejects_conflicting_max_fp() {
        let mut cfg = SolverConfig::default();
        cfg.mode = Mode::Exact;
        cfg.budgets.max_fp = Budget::Count(3);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_min_token_len() {
        let mut cfg = SolverConfig::default();
        cfg.tokenizer.min_token_len = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_budget_fraction() {
        let mut cfg = SolverConfig::default();
        cfg.budgets.max_fp = Budget::Fraction(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_negative_weight() {
        let mut cfg = SolverConfig::default();
        cfg.weights.w_pattern = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_allowed_patterns() {
        let mut cfg = SolverConfig::default();
        cfg.allowed_patterns.clear();
        assert!(cfg.validate().is_err());
    }
}
