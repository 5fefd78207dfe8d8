//! Top-level solver orchestration (`spec.md` §4.10, §6).
//!
//! Wires the pipeline — tokenize, generate, cover, select, expand, refine —
//! and the optional inversion branch, then assembles the public `Solution`.
//! The lifecycle names below (`spec.md` §4.10) only appear in comments and
//! `tracing` event names; they are not a literal state machine type, since
//! nothing here needs to pause mid-pipeline and resume later.

use tracing::debug;

use crate::bitset::Bitset;
use crate::boolean::Expr;
use crate::candidate::{self, Candidate, GenRow, GenerationParams};
use crate::config::SolverConfig;
use crate::coverage;
use crate::expand;
use crate::refine;
use crate::selector;
use crate::structured;
use crate::tokenizer;
use crate::types::{Diagnostics, Invert, Metrics, Pattern, Row, Solution, Witnesses, WITNESS_SAMPLE_CAP};
use crate::Error;

/// A fully-built solver bound to one validated configuration.
pub struct Solver {
    config: SolverConfig,
}

/// Everything one direction (normal, or include/exclude swapped for
/// inversion) produces, before translation back to global include/exclude
/// terms.
struct DirectionOutcome {
    patterns: Vec<Candidate>,
    per_pattern_include: Vec<Bitset>,
    per_pattern_exclude: Vec<Bitset>,
    n_include: usize,
    n_exclude: usize,
    candidates_generated: usize,
    candidates_retained: usize,
}

impl DirectionOutcome {
    fn include_union(&self) -> Bitset {
        let mut acc = Bitset::new(self.n_include);
        for m in &self.per_pattern_include {
            acc.or_assign(m);
        }
        acc
    }

    fn exclude_union(&self) -> Bitset {
        let mut acc = Bitset::new(self.n_exclude);
        for m in &self.per_pattern_exclude {
            acc.or_assign(m);
        }
        acc
    }
}

/// Translated, global-terms hit masks: bit `i` set means "original include[i]
/// is matched" (resp. exclude), independent of whether the winning
/// direction was inverted.
struct GlobalMasks {
    include_hit: Bitset,
    exclude_hit: Bitset,
}

fn params_from_config(config: &SolverConfig) -> GenerationParams {
    GenerationParams {
        allowed_kinds: config.allowed_patterns.clone(),
        min_token_len: config.tokenizer.min_token_len,
        per_word_substrings: config.per_word_substrings,
        max_multi_segments: config.max_multi_segments,
        max_candidates: config.max_candidates,
        field: None,
        field_weight: 1.0,
    }
}

impl Solver {
    /// Build a solver from a configuration, validating it up front
    /// (`spec.md` §4.12). A configuration error is returned immediately,
    /// never deferred to `solve`.
    pub fn new(mut config: SolverConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Solver { config })
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn run_direction(&self, include: &[&str], exclude: &[Option<&str>]) -> DirectionOutcome {
        let n_include = include.len();
        let n_exclude = exclude.len();

        // Candidates are built from lower-cased tokens; exclude values must be
        // normalized the same way or case differences would hide real FPs.
        let exclude_normalized: Vec<Option<String>> = exclude.iter().map(|v| v.map(|s| s.to_lowercase())).collect();
        let exclude_refs: Vec<Option<&str>> = exclude_normalized.iter().map(|v| v.as_deref()).collect();
        let exclude = exclude_refs.as_slice();

        let normalized: Vec<String> = include.iter().map(|s| s.to_lowercase()).collect();
        let tokens: Vec<Vec<crate::types::Token>> = include.iter().map(|s| tokenizer::tokenize(s, &self.config.tokenizer)).collect();
        let rows: Vec<GenRow<'_>> = normalized
            .iter()
            .zip(tokens.iter())
            .map(|(n, t)| GenRow {
                normalized: n.as_str(),
                tokens: t.as_slice(),
            })
            .collect();

        let params = params_from_config(&self.config);
        let generation = candidate::generate(&rows, &params);
        debug!(
            generated = generation.total_generated,
            retained = generation.candidates.len(),
            "candidates generated"
        );

        let normalized_refs: Vec<&str> = normalized.iter().map(String::as_str).collect();
        let cov = coverage::compute(&generation.candidates, &normalized_refs, exclude);

        let selection = selector::select(&generation.candidates, &cov, n_include, n_exclude, &self.config.weights, &self.config.budgets);
        debug!(chosen = selection.chosen.len(), "selection complete");

        let expansions = expand::expand(&selection.chosen, &generation.candidates, &cov, &normalized_refs, exclude);
        let mut pool = generation.candidates.clone();
        let mut pool_cov = cov.clone();
        for e in expansions {
            let (kind, wildcards, length) = candidate::classify(&e.text);
            pool[e.chosen_index] = Candidate {
                text: e.text,
                kind,
                wildcards,
                length,
                field: pool[e.chosen_index].field.clone(),
                score: pool[e.chosen_index].score,
            };
            pool_cov[e.chosen_index] = coverage::Coverage {
                include_mask: e.include_mask,
                exclude_mask: e.exclude_mask,
            };
        }
        debug!("expansion complete");

        let refinement = refine::refine(&selection.chosen, &pool, &pool_cov, &normalized_refs, exclude, &tokens);
        for m in &refinement.merges {
            pool.push(m.candidate.clone());
            pool_cov.push(coverage::Coverage {
                include_mask: m.include_mask.clone(),
                exclude_mask: m.exclude_mask.clone(),
            });
        }
        debug!(merges = refinement.merges.len(), "refinement complete");

        let patterns: Vec<Candidate> = refinement.final_chosen.iter().map(|&i| pool[i].clone()).collect();
        let per_pattern_include: Vec<Bitset> = refinement.final_chosen.iter().map(|&i| pool_cov[i].include_mask.clone()).collect();
        let per_pattern_exclude: Vec<Bitset> = refinement.final_chosen.iter().map(|&i| pool_cov[i].exclude_mask.clone()).collect();

        DirectionOutcome {
            patterns,
            per_pattern_include,
            per_pattern_exclude,
            n_include,
            n_exclude,
            candidates_generated: generation.total_generated,
            candidates_retained: generation.candidates.len(),
        }
    }

    fn global_masks(outcome: &DirectionOutcome, inverted: bool, global_n_include: usize, global_n_exclude: usize) -> GlobalMasks {
        if !inverted {
            GlobalMasks {
                include_hit: outcome.include_union(),
                exclude_hit: outcome.exclude_union(),
            }
        } else {
            debug_assert_eq!(outcome.n_include, global_n_exclude);
            debug_assert_eq!(outcome.n_exclude, global_n_include);
            GlobalMasks {
                include_hit: outcome.exclude_union().negate(),
                exclude_hit: outcome.include_union().negate(),
            }
        }
    }

    fn fp_budget_ok(&self, fp: usize, n_include: usize) -> bool {
        match self.config.budgets.max_fp.resolve(n_include) {
            Some(max_fp) => fp <= max_fp,
            None => true,
        }
    }

    /// Cost proxy used only to compare the normal vs. inverted direction:
    /// lower is better. Mirrors the selector's own cost shape so the
    /// comparison is on the same footing as pattern selection itself.
    fn orientation_cost(&self, outcome: &DirectionOutcome, masks: &GlobalMasks, global_n_include: usize) -> f64 {
        let fp = masks.exclude_hit.popcount() as f64;
        let fn_ = (global_n_include - masks.include_hit.popcount()) as f64;
        let n_patterns = outcome.patterns.len() as f64;
        let n_ops = outcome.patterns.len().saturating_sub(1) as f64;
        let sum_wc: f64 = outcome.patterns.iter().map(|c| c.wildcards as f64).sum();
        let sum_len: f64 = outcome.patterns.iter().map(|c| c.length as f64).sum();
        let w_fp = self.config.weights.w_fp.resolve(None, 1.0);
        let w_fn = self.config.weights.w_fn.resolve(None, 1.0);
        w_fp * fp + w_fn * fn_ + self.config.weights.w_pattern * n_patterns + self.config.weights.w_op * n_ops + self.config.weights.w_wc * sum_wc + self.config.weights.w_len * sum_len
    }

    fn assemble(&self, outcome: DirectionOutcome, inverted: bool, include: &[&str], exclude: &[&str]) -> Solution {
        if outcome.patterns.is_empty() {
            return Solution {
                diagnostics: Diagnostics {
                    candidates_generated: outcome.candidates_generated,
                    candidates_retained: outcome.candidates_retained,
                    truncated: outcome.candidates_generated > outcome.candidates_retained,
                },
                metrics: Metrics {
                    covered: 0,
                    total_positive: include.len(),
                    fp: 0,
                    fn_: include.len(),
                    total_negative: exclude.len(),
                },
                ..Solution::default()
            };
        }

        let masks = Self::global_masks(&outcome, inverted, include.len(), exclude.len());

        let ids: Vec<String> = (0..outcome.patterns.len()).map(|i| format!("p{i}")).collect();
        let leaves: Vec<Expr> = ids.iter().map(|id| Expr::Leaf(id.clone())).collect();
        let mut leaves_iter = leaves.into_iter();
        let mut expr = leaves_iter.next().expect("non-empty patterns checked above");
        for leaf in leaves_iter {
            expr = Expr::Or(Box::new(expr), Box::new(leaf));
        }
        if inverted {
            expr = Expr::Not(Box::new(expr));
        }
        let expr_text = expr.to_string();

        let patterns: Vec<Pattern> = outcome
            .patterns
            .iter()
            .zip(ids.iter())
            .zip(outcome.per_pattern_include.iter())
            .zip(outcome.per_pattern_exclude.iter())
            .map(|(((cand, id), inc), exc)| Pattern {
                id: id.clone(),
                text: cand.text.clone(),
                kind: cand.kind,
                wildcards: cand.wildcards,
                length: cand.length,
                field: cand.field.clone(),
                score: cand.score,
                matches: inc.popcount(),
                fp: exc.popcount(),
            })
            .collect();

        let tp_examples = sample(include, &masks.include_hit, true);
        let fn_examples = sample(include, &masks.include_hit, false);
        let fp_examples = sample(exclude, &masks.exclude_hit, true);

        crate::invariants::assert_mask_bound(&masks.include_hit);
        crate::invariants::assert_mask_bound(&masks.exclude_hit);
        crate::invariants::assert_covered_within_total(masks.include_hit.popcount(), include.len());
        crate::invariants::assert_exact_mode_zero_fp(self.config.mode, masks.exclude_hit.popcount());
        for p in &outcome.patterns {
            crate::invariants::assert_no_bare_wildcard(&p.text);
        }

        Solution {
            raw_expr: expr_text.clone(),
            expr: expr_text,
            patterns,
            metrics: Metrics {
                covered: masks.include_hit.popcount(),
                total_positive: include.len(),
                fp: masks.exclude_hit.popcount(),
                fn_: include.len() - masks.include_hit.popcount(),
                total_negative: exclude.len(),
            },
            witnesses: Witnesses {
                tp_examples,
                fp_examples,
                fn_examples,
            },
            global_inverted: inverted,
            terms: Vec::new(),
            diagnostics: Diagnostics {
                candidates_generated: outcome.candidates_generated,
                candidates_retained: outcome.candidates_retained,
                truncated: outcome.candidates_generated > outcome.candidates_retained,
            },
        }
    }

    /// Solve for a single, unstructured field: find a boolean glob
    /// expression that matches every string in `include` and as few of
    /// `exclude` as the configured budgets allow.
    pub fn solve(&self, include: &[&str], exclude: &[&str]) -> Result<Solution, Error> {
        validate_row_count(include.len(), exclude.len())?;
        validate_item_sizes(include.iter().copied().chain(exclude.iter().copied()))?;

        if include.is_empty() {
            return Ok(Solution {
                metrics: Metrics {
                    total_negative: exclude.len(),
                    ..Metrics::default()
                },
                ..Solution::default()
            });
        }

        let exclude_values: Vec<Option<&str>> = exclude.iter().map(|s| Some(*s)).collect();
        let normal = self.run_direction(include, &exclude_values);

        let try_invert = !matches!(self.config.invert, Invert::Never) && !exclude.is_empty();

        if !try_invert {
            return Ok(self.assemble(normal, false, include, exclude));
        }

        let include_values: Vec<Option<&str>> = include.iter().map(|s| Some(*s)).collect();
        let inverted = self.run_direction(exclude, &include_values);

        let inv_masks = Self::global_masks(&inverted, true, include.len(), exclude.len());
        let inv_fp_ok = self.fp_budget_ok(inv_masks.exclude_hit.popcount(), include.len());

        let use_inverted = match self.config.invert {
            Invert::Always => inv_fp_ok,
            Invert::Auto => {
                if !inv_fp_ok || inverted.patterns.is_empty() {
                    false
                } else {
                    let normal_masks = Self::global_masks(&normal, false, include.len(), exclude.len());
                    let normal_cost = self.orientation_cost(&normal, &normal_masks, include.len());
                    let inv_cost = self.orientation_cost(&inverted, &inv_masks, include.len());
                    inv_cost < normal_cost
                }
            }
            Invert::Never => unreachable!("handled by try_invert guard above"),
        };

        if use_inverted {
            Ok(self.assemble(inverted, true, include, exclude))
        } else {
            Ok(self.assemble(normal, false, include, exclude))
        }
    }

    /// Solve for structured (multi-field) rows: find a disjunction of
    /// per-field conjunctions matching every `include` row and as few
    /// `exclude` rows as the configured budgets allow (`spec.md` §4.8).
    pub fn solve_structured(&self, include: &[Row], exclude: &[Row]) -> Result<Solution, Error> {
        validate_row_count(include.len(), exclude.len())?;
        validate_item_sizes(
            include
                .iter()
                .chain(exclude.iter())
                .flat_map(|row| row.values())
                .filter_map(|v| v.as_deref()),
        )?;
        validate_field_sets(include)?;

        if include.is_empty() {
            return Ok(Solution {
                metrics: Metrics {
                    total_negative: exclude.len(),
                    ..Metrics::default()
                },
                ..Solution::default()
            });
        }

        let outcome = structured::solve(&self.config, include, exclude);

        // An EXACT-mode (or otherwise over-budget) instance that cannot be
        // separated without false positives is reported as the empty
        // solution, not an error (`spec.md` §4.11 "unsolvable EXACT
        // instance").
        let unsolvable = outcome.terms.is_empty() || !self.fp_budget_ok(outcome.exclude_hit.popcount(), include.len());

        if unsolvable {
            return Ok(Solution {
                diagnostics: Diagnostics::default(),
                metrics: Metrics {
                    covered: 0,
                    total_positive: include.len(),
                    fp: 0,
                    fn_: include.len(),
                    total_negative: exclude.len(),
                },
                ..Solution::default()
            });
        }

        let raw_expr = structured::render(&outcome.terms);

        // Symbolic form: assign one P_i per field-pattern, in term/field
        // order, and AND/OR them the same shape as raw_expr.
        let mut next_id = 0usize;
        let mut term_exprs = Vec::with_capacity(outcome.terms.len());
        let mut all_patterns: Vec<Pattern> = Vec::new();
        for term in &outcome.terms {
            let mut factors = Vec::with_capacity(term.fields.len());
            for pattern in term.fields.values() {
                let id = format!("P{next_id}");
                next_id += 1;
                factors.push(Expr::Leaf(id.clone()));
                let mut labeled = pattern.clone();
                labeled.id = id;
                all_patterns.push(labeled);
            }
            let mut factors_iter = factors.into_iter();
            let mut term_expr = factors_iter.next().expect("build_term never returns an empty pick list");
            for f in factors_iter {
                term_expr = Expr::And(Box::new(term_expr), Box::new(f));
            }
            term_exprs.push(term_expr);
        }
        let mut terms_iter = term_exprs.into_iter();
        let mut expr = terms_iter.next().expect("non-empty terms checked above");
        for t in terms_iter {
            expr = Expr::Or(Box::new(expr), Box::new(t));
        }

        let row_strings: Vec<String> = include.iter().map(render_row).collect();
        let row_refs: Vec<&str> = row_strings.iter().map(String::as_str).collect();
        let exc_strings: Vec<String> = exclude.iter().map(render_row).collect();
        let exc_refs: Vec<&str> = exc_strings.iter().map(String::as_str).collect();

        let tp_examples = sample(&row_refs, &outcome.include_hit, true);
        let fn_examples = sample(&row_refs, &outcome.include_hit, false);
        let fp_examples = sample(&exc_refs, &outcome.exclude_hit, true);

        crate::invariants::assert_mask_bound(&outcome.include_hit);
        crate::invariants::assert_mask_bound(&outcome.exclude_hit);
        crate::invariants::assert_covered_within_total(outcome.include_hit.popcount(), include.len());
        crate::invariants::assert_exact_mode_zero_fp(self.config.mode, outcome.exclude_hit.popcount());

        Ok(Solution {
            expr: expr.to_string(),
            raw_expr,
            patterns: all_patterns,
            metrics: Metrics {
                covered: outcome.include_hit.popcount(),
                total_positive: include.len(),
                fp: outcome.exclude_hit.popcount(),
                fn_: include.len() - outcome.include_hit.popcount(),
                total_negative: exclude.len(),
            },
            witnesses: Witnesses {
                tp_examples,
                fp_examples,
                fn_examples,
            },
            global_inverted: false,
            terms: outcome.terms,
            diagnostics: Diagnostics::default(),
        })
    }
}

/// Rejects an instance whose combined row count exceeds [`crate::MAX_ROWS`]
/// (`spec.md` §7 "Input error").
fn validate_row_count(n_include: usize, n_exclude: usize) -> Result<(), Error> {
    let total = n_include.saturating_add(n_exclude);
    if total > crate::MAX_ROWS {
        return Err(Error::Input(format!("{total} rows exceeds the {} row limit", crate::MAX_ROWS)));
    }
    Ok(())
}

/// Rejects an instance containing any item over [`crate::MAX_INPUT_SIZE`]
/// bytes (`spec.md` §7 "Input error").
fn validate_item_sizes<'a>(items: impl Iterator<Item = &'a str>) -> Result<(), Error> {
    for item in items {
        if item.len() > crate::MAX_INPUT_SIZE {
            return Err(Error::Input(format!("item of {} bytes exceeds the {} byte limit", item.len(), crate::MAX_INPUT_SIZE)));
        }
    }
    Ok(())
}

/// Rejects structured `include` rows that don't all share the same set of
/// field names: the structured solver assumes a uniform schema across rows,
/// so a mismatched row would otherwise be silently treated as all-`None` for
/// its missing fields (`spec.md` §7 "rows with mismatched field sets in
/// structured mode... fail fast").
fn validate_field_sets(include: &[Row]) -> Result<(), Error> {
    let mut rows = include.iter();
    let Some(first) = rows.next() else {
        return Ok(());
    };
    let expected: std::collections::BTreeSet<&String> = first.keys().collect();
    for row in rows {
        let actual: std::collections::BTreeSet<&String> = row.keys().collect();
        if actual != expected {
            return Err(Error::Input(format!(
                "structured rows have mismatched field sets: expected {:?}, found {:?}",
                expected, actual
            )));
        }
    }
    Ok(())
}

fn sample(items: &[&str], hit: &Bitset, on_hit: bool) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| hit.get(*i) == on_hit)
        .take(WITNESS_SAMPLE_CAP)
        .map(|(_, s)| (*s).to_string())
        .collect()
}

/// Render a structured row as a single witness string: `field=value, ...`,
/// `None` fields shown as `field=*`.
fn render_row(row: &Row) -> String {
    row.iter()
        .map(|(k, v)| format!("{k}={}", v.as_deref().unwrap_or("*")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience entry point: validate `config`, then solve once.
pub fn solve(config: SolverConfig, include: &[&str], exclude: &[&str]) -> Result<Solution, Error> {
    Solver::new(config)?.solve(include, exclude)
}
