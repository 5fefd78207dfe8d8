//! Greedy cost-driven selector (`spec.md` §4.5).
//!
//! Consults the candidate pool read-only, referencing chosen candidates by
//! index (`spec.md` §9 "candidate pool memory" design note) rather than
//! taking ownership, so the pool can be shared across iterations without
//! cloning.

use crate::bitset::Bitset;
use crate::candidate::Candidate;
use crate::coverage::Coverage;
use crate::types::{Budgets, CostWeights};

/// Outcome of one greedy selection run.
#[derive(Debug, Clone)]
pub struct Selection {
    pub chosen: Vec<usize>,
    pub include_bits: Bitset,
    pub exclude_bits: Bitset,
}

impl Selection {
    fn empty(n_include: usize, n_exclude: usize) -> Self {
        Selection {
            chosen: Vec::new(),
            include_bits: Bitset::new(n_include),
            exclude_bits: Bitset::new(n_exclude),
        }
    }
}

struct ResolvedBudgets {
    max_patterns: Option<usize>,
    max_fp: Option<usize>,
    max_fn: Option<usize>,
}

fn resolve_budgets(budgets: &Budgets, n_include: usize) -> ResolvedBudgets {
    ResolvedBudgets {
        max_patterns: budgets.max_patterns.resolve(n_include),
        max_fp: budgets.max_fp.resolve(n_include),
        max_fn: budgets.max_fn.resolve(n_include),
    }
}

/// Fraction-weighted average of a per-field-or-uniform weight over the
/// currently chosen candidates (`spec.md` §4.5: "per-field variants are
/// summed by multiplying their contribution by the fraction of that
/// field's chosen patterns").
fn effective_weight(weights: &crate::types::Weights<f64>, chosen: &[&Candidate], default: f64) -> f64 {
    match weights {
        crate::types::Weights::Uniform(v) => *v,
        crate::types::Weights::PerField(_) => {
            if chosen.is_empty() {
                return default;
            }
            let total = chosen.len() as f64;
            let sum: f64 = chosen
                .iter()
                .map(|c| weights.resolve(c.field.as_deref(), default))
                .sum();
            sum / total
        }
    }
}

fn cost(
    chosen: &[&Candidate],
    include_bits: &Bitset,
    exclude_bits: &Bitset,
    n_include: usize,
    weights: &CostWeights,
) -> f64 {
    let w_fp = effective_weight(&weights.w_fp, chosen, 1.0);
    let w_fn = effective_weight(&weights.w_fn, chosen, 1.0);

    let fp = exclude_bits.popcount() as f64;
    let fn_ = (n_include - include_bits.popcount()) as f64;
    let n_patterns = chosen.len() as f64;
    let n_ops = chosen.len().saturating_sub(1) as f64;
    let sum_wc: f64 = chosen.iter().map(|c| c.wildcards as f64).sum();
    let sum_len: f64 = chosen.iter().map(|c| c.length as f64).sum();

    w_fp * fp
        + w_fn * fn_
        + weights.w_pattern * n_patterns
        + weights.w_op * n_ops
        + weights.w_wc * sum_wc
        + weights.w_len * sum_len
}

/// Run the greedy set-cover selector over `candidates`/`coverage` (indices
/// aligned 1:1), returning the chosen subset and its coverage union.
#[must_use]
pub fn select(
    candidates: &[Candidate],
    coverage: &[Coverage],
    n_include: usize,
    n_exclude: usize,
    weights: &CostWeights,
    budgets: &Budgets,
) -> Selection {
    let resolved = resolve_budgets(budgets, n_include);
    let mut state = Selection::empty(n_include, n_exclude);
    let mut chosen_refs: Vec<&Candidate> = Vec::new();
    let mut current_cost = cost(&chosen_refs, &state.include_bits, &state.exclude_bits, n_include, weights);

    loop {
        if let Some(max_patterns) = resolved.max_patterns {
            if state.chosen.len() >= max_patterns {
                break;
            }
        }

        if state.include_bits.equal_all_ones() && !state.exclude_bits.any_bit() {
            break;
        }

        let mut best: Option<(usize, f64, usize)> = None; // (index, cost, incremental_gain)

        for (idx, cand) in candidates.iter().enumerate() {
            if state.chosen.contains(&idx) {
                continue;
            }
            let cov = &coverage[idx];

            let hyp_include = state.include_bits.or(&cov.include_mask);
            let hyp_exclude = state.exclude_bits.or(&cov.exclude_mask);

            if let Some(max_fp) = resolved.max_fp {
                if hyp_exclude.popcount() > max_fp {
                    continue;
                }
            }
            if let Some(max_fn) = resolved.max_fn {
                if (n_include - hyp_include.popcount()) > max_fn {
                    continue;
                }
            }

            let mut hyp_refs = chosen_refs.clone();
            hyp_refs.push(cand);
            let hyp_cost = cost(&hyp_refs, &hyp_include, &hyp_exclude, n_include, weights);
            let gain = hyp_include.popcount() - state.include_bits.popcount();

            let better = match &best {
                None => true,
                Some((best_idx, best_cost, best_gain)) => {
                    if hyp_cost != *best_cost {
                        hyp_cost < *best_cost
                    } else if gain != *best_gain {
                        gain > *best_gain
                    } else if cand.wildcards != candidates[*best_idx].wildcards {
                        cand.wildcards < candidates[*best_idx].wildcards
                    } else if cand.length != candidates[*best_idx].length {
                        cand.length > candidates[*best_idx].length
                    } else {
                        cand.text < candidates[*best_idx].text
                    }
                }
            };

            if better {
                best = Some((idx, hyp_cost, gain));
            }
        }

        match best {
            Some((idx, hyp_cost, _gain)) if hyp_cost < current_cost => {
                state.chosen.push(idx);
                state.include_bits.or_assign(&coverage[idx].include_mask);
                state.exclude_bits.or_assign(&coverage[idx].exclude_mask);
                chosen_refs.push(&candidates[idx]);
                current_cost = hyp_cost;
            }
            _ => break,
        }
    }

    state
}
