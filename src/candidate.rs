//! Candidate generation and scoring (`spec.md` §4.3).
//!
//! Produces a deduplicated, deterministically top-k-truncated pool of glob
//! candidates from a set of include rows and their tokens. Every candidate
//! is constructed so that it literally matches at least one include item
//! (the row it was derived from), satisfying the generation-time invariant
//! in `spec.md` §3.
//!
//! Prefix/suffix candidates carry the literal delimiter run up to the next
//! token boundary (`alpha/*`, not the over-broad `alpha*`), so the anchor
//! never matches past the point the tokenizer itself would have split.

use std::collections::{HashMap, HashSet};

use crate::types::{PatternKind, Token};

/// One input row as seen by the generator: its normalized (lower-cased)
/// original text and its tokens.
pub struct GenRow<'a> {
    pub normalized: &'a str,
    pub tokens: &'a [Token],
}

/// A generated, not-yet-selected pattern. Distinct from `Pattern` (the
/// output shape, `spec.md` §3) in that it has no `id` yet and carries no
/// coverage statistics — those are filled in by the coverage engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub kind: PatternKind,
    pub wildcards: usize,
    pub length: usize,
    pub field: Option<String>,
    pub score: f64,
}

/// Knobs bounding candidate generation (`spec.md` §4.3, §5).
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub allowed_kinds: HashSet<PatternKind>,
    pub min_token_len: usize,
    pub per_word_substrings: usize,
    pub max_multi_segments: usize,
    pub max_candidates: usize,
    pub field: Option<String>,
    pub field_weight: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            allowed_kinds: [
                PatternKind::Exact,
                PatternKind::Prefix,
                PatternKind::Suffix,
                PatternKind::Substring,
                PatternKind::Multi,
            ]
            .into_iter()
            .collect(),
            min_token_len: 1,
            per_word_substrings: usize::MAX,
            max_multi_segments: 4,
            max_candidates: 4000,
            field: None,
            field_weight: 1.0,
        }
    }
}

/// Result of generation: the retained (top-k) candidate pool plus how many
/// distinct candidates existed before truncation (`spec.md` §7.3).
pub struct GenerationResult {
    pub candidates: Vec<Candidate>,
    pub total_generated: usize,
}

/// Insertion-order-preserving, dedup-on-insert candidate accumulator
/// (`spec.md` §9: "use order-preserving hash maps keyed on insertion order").
struct Pool {
    order: Vec<Candidate>,
    seen: HashMap<(PatternKind, String), usize>,
}

impl Pool {
    fn new() -> Self {
        Pool {
            order: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn push(&mut self, kind: PatternKind, text: String, wildcards: usize, length: usize, score: f64, field: Option<String>) {
        let key = (kind, text.clone());
        if self.seen.contains_key(&key) {
            return;
        }
        self.seen.insert(key, self.order.len());
        self.order.push(Candidate {
            text,
            kind,
            wildcards,
            length,
            field,
            score,
        });
    }
}

/// The literal delimiter run immediately after `token` in `s`, given
/// `s.starts_with(token)`: every non-alphanumeric character up to the next
/// letter/digit (or end of string). Mirrors `tokenizer::tokenize`'s own
/// notion of a delimiter run, so a prefix candidate's anchor is bounded at
/// the same place the tokenizer would have split.
fn delimiter_run_after<'a>(s: &'a str, token: &str) -> &'a str {
    let start = token.len();
    let mut end = start;
    for c in s[start..].chars() {
        if c.is_alphanumeric() {
            break;
        }
        end += c.len_utf8();
    }
    &s[start..end]
}

/// The literal delimiter run immediately before `token` in `s`, given
/// `s.ends_with(token)`: every non-alphanumeric character back to the
/// previous letter/digit (or start of string).
fn delimiter_run_before<'a>(s: &'a str, token: &str) -> &'a str {
    let end = s.len() - token.len();
    let mut start = end;
    for c in s[..end].chars().rev() {
        if c.is_alphanumeric() {
            break;
        }
        start -= c.len_utf8();
    }
    &s[start..end]
}

/// Classify a raw pattern text (e.g. one synthesized by expansion or
/// refinement) into its `PatternKind`/wildcard-count/literal-length shape,
/// the same way generation would have labeled it had it produced this text
/// directly.
#[must_use]
pub fn classify(text: &str) -> (PatternKind, usize, usize) {
    let wildcards = text.chars().filter(|&c| c == '*').count();
    let length = text.chars().filter(|&c| c != '*').count();
    let kind = if wildcards == 0 {
        PatternKind::Exact
    } else if text.starts_with('*') && text.ends_with('*') {
        if wildcards > 2 {
            PatternKind::Multi
        } else {
            PatternKind::Substring
        }
    } else if text.ends_with('*') {
        PatternKind::Prefix
    } else if text.starts_with('*') {
        PatternKind::Suffix
    } else {
        PatternKind::Multi
    };
    (kind, wildcards, length)
}

/// Generate the candidate pool for one field's (or the whole, single-field)
/// include rows.
#[must_use]
pub fn generate(rows: &[GenRow<'_>], params: &GenerationParams) -> GenerationResult {
    let mut pool = Pool::new();

    for row in rows {
        if params.allowed_kinds.contains(&PatternKind::Exact)
            && row.tokens.len() == 1
            && row.tokens[0].text == row.normalized
        {
            let length = row.normalized.chars().count();
            let score = length as f64 * PatternKind::Exact.score_multiplier() * params.field_weight;
            pool.push(PatternKind::Exact, row.normalized.to_string(), 0, length, score, params.field.clone());
        }

        for (i, token) in row.tokens.iter().enumerate() {
            if params.allowed_kinds.contains(&PatternKind::Prefix) && row.normalized.starts_with(&token.text) {
                let delim = delimiter_run_after(row.normalized, &token.text);
                let text = format!("{}{}*", token.text, delim);
                let length = token.text.chars().count() + delim.chars().count();
                let score = length as f64 * PatternKind::Prefix.score_multiplier() * params.field_weight;
                pool.push(PatternKind::Prefix, text, 1, length, score, params.field.clone());
            }

            if params.allowed_kinds.contains(&PatternKind::Suffix) && row.normalized.ends_with(&token.text) {
                let delim = delimiter_run_before(row.normalized, &token.text);
                let text = format!("*{}{}", delim, token.text);
                let length = token.text.chars().count() + delim.chars().count();
                let score = length as f64 * PatternKind::Suffix.score_multiplier() * params.field_weight;
                pool.push(PatternKind::Suffix, text, 1, length, score, params.field.clone());
            }

            if params.allowed_kinds.contains(&PatternKind::Substring)
                && token.text.chars().count() >= params.min_token_len
                && i < params.per_word_substrings
            {
                let length = token.text.chars().count();
                let score = length as f64 * PatternKind::Substring.score_multiplier() * params.field_weight;
                pool.push(PatternKind::Substring, format!("*{}*", token.text), 2, length, score, params.field.clone());
            }
        }

        if params.allowed_kinds.contains(&PatternKind::Multi) && row.tokens.len() >= 2 {
            let max_window = params.max_multi_segments.min(row.tokens.len());
            for window in 2..=max_window {
                for start in 0..=(row.tokens.len() - window) {
                    let segment = &row.tokens[start..start + window];
                    let length: usize = segment.iter().map(|t| t.text.chars().count()).sum();
                    let mut text = String::from("*");
                    for t in segment {
                        text.push_str(&t.text);
                        text.push('*');
                    }
                    let wildcards = window + 1;
                    let score = length as f64 * params.field_weight;
                    pool.push(PatternKind::Multi, text, wildcards, length, score, params.field.clone());
                }
            }
        }
    }

    let total_generated = pool.order.len();
    let mut candidates = pool.order;

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.wildcards.cmp(&b.wildcards))
            .then_with(|| b.length.cmp(&a.length))
            .then_with(|| a.text.cmp(&b.text))
    });
    candidates.truncate(params.max_candidates);

    GenerationResult {
        candidates,
        total_generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::types::TokenizerConfig;

    fn gen_for(strings: &[&str], params: &GenerationParams) -> (Vec<String>, GenerationResult) {
        let cfg = TokenizerConfig::default();
        let normalized: Vec<String> = strings.iter().map(|s| s.to_lowercase()).collect();
        let tokens: Vec<Vec<Token>> = strings.iter().map(|s| tokenize(s, &cfg)).collect();
        let rows: Vec<GenRow<'_>> = normalized
            .iter()
            .zip(tokens.iter())
            .map(|(n, t)| GenRow {
                normalized: n.as_str(),
                tokens: t.as_slice(),
            })
            .collect();
        let result = generate(&rows, params);
        (normalized, result)
    }

    #[test]
    fn every_candidate_matches_its_source_row() {
        let params = GenerationParams::default();
        let (normalized, result) = gen_for(&["alpha/module1/mem", "beta/cache/bank0"], &params);
        for c in &result.candidates {
            assert!(
                normalized.iter().any(|s| crate::glob::matches(&c.text, s)),
                "candidate {:?} matches no source row",
                c
            );
        }
    }

    #[test]
    fn no_bare_wildcard_ever_emitted() {
        let params = GenerationParams::default();
        let (_normalized, result) = gen_for(&["a", "ab", "abc/def"], &params);
        for c in &result.candidates {
            assert!(!crate::glob::is_bare_wildcard(&c.text));
        }
    }

    #[test]
    fn exact_only_for_single_token_rows() {
        let params = GenerationParams::default();
        let (_normalized, result) = gen_for(&["chip"], &params);
        assert!(result.candidates.iter().any(|c| c.kind == PatternKind::Exact && c.text == "chip"));
    }

    #[test]
    fn prefix_and_suffix_gated_by_boundary() {
        let params = GenerationParams::default();
        let (_normalized, result) = gen_for(&["alpha/module1/mem"], &params);
        assert!(result
            .candidates
            .iter()
            .any(|c| c.kind == PatternKind::Prefix && c.text == "alpha/*"));
        assert!(result
            .candidates
            .iter()
            .any(|c| c.kind == PatternKind::Suffix && c.text == "*/mem"));
    }

    #[test]
    fn prefix_anchor_does_not_over_match_past_the_delimiter() {
        // A prefix candidate for "alpha" must be "alpha/*", which does not
        // match "alphabet/x" — the bare "alpha*" form would.
        let params = GenerationParams::default();
        let (_normalized, result) = gen_for(&["alpha/module1/mem"], &params);
        let prefix = result
            .candidates
            .iter()
            .find(|c| c.kind == PatternKind::Prefix && c.text.starts_with("alpha"))
            .expect("a prefix candidate anchored on \"alpha\" is generated");
        assert!(!crate::glob::matches(&prefix.text, "alphabet/x"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let params = GenerationParams::default();
        let (_normalized, result) = gen_for(&["cache/cache"], &params);
        let count = result
            .candidates
            .iter()
            .filter(|c| c.kind == PatternKind::Substring && c.text == "*cache*")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn truncation_reports_total_generated() {
        let mut params = GenerationParams::default();
        params.max_candidates = 1;
        let (_normalized, result) = gen_for(&["alpha/module1/mem", "beta/cache/bank0"], &params);
        assert_eq!(result.candidates.len(), 1);
        assert!(result.total_generated >= 1);
    }

    #[test]
    fn multi_segment_window_bounds() {
        let mut params = GenerationParams::default();
        params.max_multi_segments = 2;
        let (_normalized, result) = gen_for(&["chip/cpu/core0/l1"], &params);
        assert!(result
            .candidates
            .iter()
            .all(|c| c.kind != PatternKind::Multi || c.wildcards <= 3));
    }

    #[test]
    fn deterministic_ordering_across_runs() {
        let params = GenerationParams::default();
        let (_n1, r1) = gen_for(&["alpha/module1/mem", "beta/cache/bank0"], &params);
        let (_n2, r2) = gen_for(&["alpha/module1/mem", "beta/cache/bank0"], &params);
        let t1: Vec<&str> = r1.candidates.iter().map(|c| c.text.as_str()).collect();
        let t2: Vec<&str> = r2.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(t1, t2);
    }
}
