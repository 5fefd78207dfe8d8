//! Structured (multi-field) solving (`spec.md` §4.8).
//!
//! Builds a disjunction of conjunctive `Term`s. Each term is grown around a
//! pivot include row: fields are added to the term's conjunction (in
//! deterministic field-name order) one at a time, each contributed pattern
//! built so it literally matches the pivot's own value for that field,
//! until the term's false-positive hit set is empty or every field has been
//! tried. Because AND-ing a pattern into a conjunction can only narrow
//! (never grow) both its include and exclude hit sets, this always
//! terminates and the term always still covers the pivot.
//!
//! At most one pattern per field per term (`spec.md` §4.8 "lazy multi-field
//! specialization").
//!
//! `effort` (`spec.md` §6) adjusts how a term is grown: `Low` stops after
//! the first field constraint, restricting each term to a single field the
//! way an unstructured solve would; `Exhaustive` tries every currently
//! uncovered row as the next term's pivot (not just the first) when the
//! instance is small enough (`N<100, F<5`) to afford it, picking whichever
//! pivot yields the lowest-FP term. `Medium`/`High` run the plain
//! first-uncovered-pivot heuristic.

use std::collections::BTreeSet;

use crate::bitset::Bitset;
use crate::candidate::{self, Candidate, GenRow, GenerationParams};
use crate::config::SolverConfig;
use crate::coverage;
use crate::tokenizer;
use crate::types::{Effort, Pattern, Row, Term};

struct FieldColumn {
    include_values: Vec<Option<String>>,
    exclude_values: Vec<Option<String>>,
}

fn build_column(field: &str, include: &[Row], exclude: &[Row]) -> FieldColumn {
    FieldColumn {
        include_values: include.iter().map(|r| r.get(field).and_then(|v| v.clone()).map(|s| s.to_lowercase())).collect(),
        exclude_values: exclude.iter().map(|r| r.get(field).cloned().flatten().map(|s| s.to_lowercase())).collect(),
    }
}

fn field_names(include: &[Row]) -> Vec<String> {
    let mut set = BTreeSet::new();
    for row in include {
        for key in row.keys() {
            set.insert(key.clone());
        }
    }
    set.into_iter().collect()
}

/// One field's chosen pattern inside a term under construction.
struct FieldPick {
    field: String,
    candidate: Candidate,
    include_mask: Bitset,
    exclude_mask: Bitset,
}

fn best_candidate_for_pivot(
    config: &SolverConfig,
    field: &str,
    pivot_value: &str,
    column: &FieldColumn,
    n_include: usize,
    n_exclude: usize,
) -> Option<(Candidate, Bitset, Bitset)> {
    let tokens = tokenizer::tokenize(pivot_value, &config.tokenizer);
    let row = GenRow {
        normalized: pivot_value,
        tokens: &tokens,
    };
    let field_weight = config.field_weights.resolve(Some(field), 1.0);
    let params = GenerationParams {
        allowed_kinds: config.allowed_patterns.clone(),
        min_token_len: config.tokenizer.min_token_len,
        per_word_substrings: config.per_word_substrings,
        max_multi_segments: config.max_multi_segments,
        max_candidates: config.max_candidates,
        field: Some(field.to_string()),
        field_weight,
    };
    let generation = candidate::generate(&[row], &params);

    let include_refs: Vec<&str> = column
        .include_values
        .iter()
        .map(|v| v.as_deref().unwrap_or(""))
        .collect();
    let exclude_refs: Vec<Option<&str>> = column.exclude_values.iter().map(|v| v.as_deref()).collect();

    let cov = coverage::compute(&generation.candidates, &include_refs, &exclude_refs);

    // Mask out include rows with no value for this field: an empty string
    // can never be a genuine field value, so it only ever matches via a
    // bare wildcard, which candidate generation never produces.
    let mut valid = Bitset::new(n_include);
    for (i, v) in column.include_values.iter().enumerate() {
        if v.is_some() {
            valid.set(i);
        }
    }

    generation
        .candidates
        .into_iter()
        .zip(cov)
        .map(|(c, cv)| {
            let inc = cv.include_mask.and(&valid);
            (c, inc, cv.exclude_mask)
        })
        .min_by(|(a, a_inc, a_exc), (b, b_inc, b_exc)| {
            let a_cost = a_exc.popcount() as f64 - a_inc.popcount() as f64 * 0.001 + a.wildcards as f64 * 0.01;
            let b_cost = b_exc.popcount() as f64 - b_inc.popcount() as f64 * 0.001 + b.wildcards as f64 * 0.01;
            a_cost.partial_cmp(&b_cost).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(c, inc, exc)| {
            let mut full_exc = Bitset::new(n_exclude);
            full_exc.or_assign(&exc);
            (c, inc, full_exc)
        })
}

fn build_term(
    config: &SolverConfig,
    pivot: usize,
    columns: &[(String, FieldColumn)],
    n_include: usize,
    n_exclude: usize,
) -> (Bitset, Bitset, Vec<FieldPick>) {
    let mut term_include = Bitset::all_ones(n_include);
    let mut term_exclude = Bitset::all_ones(n_exclude);
    let mut picks = Vec::new();

    for (field, column) in columns {
        if !term_exclude.any_bit() {
            break;
        }
        // `Low` effort restricts a term to a single field, the way an
        // unstructured (single-field) solve would.
        if config.effort == Effort::Low && !picks.is_empty() {
            break;
        }
        let Some(pivot_value) = column.include_values[pivot].as_deref() else {
            continue;
        };

        if let Some((candidate, inc, exc)) = best_candidate_for_pivot(config, field, pivot_value, column, n_include, n_exclude) {
            let hyp_include = term_include.and(&inc);
            let hyp_exclude = term_exclude.and(&exc);

            // Only adopt this field constraint if the pivot itself still
            // satisfies it (guaranteed, since the candidate was generated
            // from the pivot's own value) and it actually narrows exclude
            // coverage or is the first constraint.
            if hyp_include.get(pivot) && (hyp_exclude.popcount() < term_exclude.popcount() || picks.is_empty()) {
                term_include = hyp_include;
                term_exclude = hyp_exclude;
                picks.push(FieldPick {
                    field: field.clone(),
                    candidate,
                    include_mask: inc,
                    exclude_mask: exc,
                });
            }
        }
    }

    (term_include, term_exclude, picks)
}

/// Build a term from every currently uncovered pivot and keep whichever one
/// has the lowest resulting false-positive count (ties broken by greatest
/// incremental include coverage, then by lowest pivot index for
/// determinism). Used only under `Effort::Exhaustive` on small instances —
/// `solve`'s first-uncovered-pivot heuristic is a single data point in this
/// same search space, not a different one.
fn best_term_over_all_pivots(
    config: &SolverConfig,
    uncovered: &Bitset,
    columns: &[(String, FieldColumn)],
    n_include: usize,
    n_exclude: usize,
    include_hit: &Bitset,
) -> (usize, Bitset, Bitset, Vec<FieldPick>) {
    let mut best: Option<(usize, Bitset, Bitset, Vec<FieldPick>, usize, usize)> = None;

    for pivot in uncovered.iter_ones() {
        let (term_include, term_exclude, picks) = build_term(config, pivot, columns, n_include, n_exclude);
        if picks.is_empty() {
            continue;
        }
        let fp = term_exclude.popcount();
        let incremental = term_include.andnot(include_hit).popcount();

        let better = match &best {
            None => true,
            Some((_, _, _, _, best_fp, best_incremental)) => {
                if fp != *best_fp {
                    fp < *best_fp
                } else {
                    incremental > *best_incremental
                }
            }
        };

        if better {
            best = Some((pivot, term_include, term_exclude, picks, fp, incremental));
        }
    }

    match best {
        Some((pivot, term_include, term_exclude, picks, ..)) => (pivot, term_include, term_exclude, picks),
        None => {
            let pivot = uncovered.iter_ones().next().expect("any_bit implies an index");
            (pivot, Bitset::new(n_include), Bitset::new(n_exclude), Vec::new())
        }
    }
}

/// Result of the structured solve: the term list, union include/exclude hit
/// masks, and diagnostics.
pub struct StructuredOutcome {
    pub terms: Vec<Term>,
    pub include_hit: Bitset,
    pub exclude_hit: Bitset,
}

#[must_use]
pub fn solve(config: &SolverConfig, include: &[Row], exclude: &[Row]) -> StructuredOutcome {
    let n_include = include.len();
    let n_exclude = exclude.len();
    let fields = field_names(include);
    let columns: Vec<(String, FieldColumn)> = fields.iter().map(|f| (f.clone(), build_column(f, include, exclude))).collect();

    let mut uncovered = Bitset::all_ones(n_include);
    let mut terms = Vec::new();
    let mut include_hit = Bitset::new(n_include);
    let mut exclude_hit = Bitset::new(n_exclude);

    let max_terms = config.budgets.max_patterns.resolve(n_include.max(1)).unwrap_or(n_include.max(1));

    // `spec.md` §6: "exhaustive is reserved for datasets with N<100, F<5" —
    // outside that bound it degrades to the same first-uncovered-pivot
    // heuristic as `Medium`/`High`.
    let exhaustive = config.effort == Effort::Exhaustive && n_include < 100 && fields.len() < 5;

    while uncovered.any_bit() && terms.len() < max_terms {
        let (pivot, term_include, term_exclude, picks) = if exhaustive {
            best_term_over_all_pivots(config, &uncovered, &columns, n_include, n_exclude, &include_hit)
        } else {
            let pivot = uncovered.iter_ones().next().expect("any_bit implies an index");
            let (term_include, term_exclude, picks) = build_term(config, pivot, &columns, n_include, n_exclude);
            (pivot, term_include, term_exclude, picks)
        };

        if picks.is_empty() {
            // No field could be used to build a constraint from this pivot
            // (e.g. every field is don't-care for it); mark it covered by
            // the vacuous "always true" term to avoid looping forever, and
            // move on.
            let mut singleton = Bitset::new(n_include);
            singleton.set(pivot);
            uncovered = uncovered.andnot(&singleton);
            continue;
        }

        let mut field_map = std::collections::BTreeMap::new();
        let mut term_length = 0usize;
        for pick in &picks {
            term_length += pick.candidate.length;
            field_map.insert(
                pick.field.clone(),
                Pattern {
                    id: format!("t{}_{}", terms.len(), pick.field),
                    text: pick.candidate.text.clone(),
                    kind: pick.candidate.kind,
                    wildcards: pick.candidate.wildcards,
                    length: pick.candidate.length,
                    field: Some(pick.field.clone()),
                    score: pick.candidate.score,
                    matches: pick.include_mask.popcount(),
                    fp: pick.exclude_mask.popcount(),
                },
            );
        }

        let incremental = term_include.andnot(&include_hit);

        terms.push(Term {
            fields: field_map,
            matches: term_include.popcount(),
            fp: term_exclude.popcount(),
            fn_: n_include - term_include.popcount(),
            incremental_matches: incremental.popcount(),
            incremental_fp: term_exclude.popcount(),
            length: term_length,
        });

        include_hit.or_assign(&term_include);
        exclude_hit.or_assign(&term_exclude);
        uncovered = uncovered.andnot(&term_include);
    }

    StructuredOutcome {
        terms,
        include_hit,
        exclude_hit,
    }
}

/// Render a structured solution's raw expression text:
/// `(f1: p1) & (f2: p2) | (f1: p3) & (f3: p4)`.
#[must_use]
pub fn render(terms: &[Term]) -> String {
    terms
        .iter()
        .map(|term| {
            term.fields
                .iter()
                .map(|(field, pattern)| format!("({field}: {})", pattern.text))
                .collect::<Vec<_>>()
                .join(" & ")
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
