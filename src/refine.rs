//! Refinement (`spec.md` §4.6).
//!
//! Runs after expansion: repeatedly looks for a pair of chosen patterns
//! that can be replaced by a single, more general pattern without dropping
//! any of the pair's combined include coverage or increasing its combined
//! exclude coverage. Candidates for the replacement are synthesized the
//! same three ways generation itself would produce them for a row sharing
//! that coverage: a common-prefix anchor, a single common token, or an
//! ordered run of common tokens (`spec.md` §9 "refinement pool memory").

use crate::bitset::Bitset;
use crate::candidate::Candidate;
use crate::coverage::Coverage;
use crate::glob;
use crate::types::Token;

fn longest_common_prefix(items: &[&str]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let first_chars: Vec<char> = first.chars().collect();
    let mut shared_len = first_chars.len();
    for item in &items[1..] {
        let mut shared = 0;
        for (a, b) in first_chars.iter().zip(item.chars()) {
            if *a == b {
                shared += 1;
            } else {
                break;
            }
        }
        shared_len = shared_len.min(shared);
    }
    first_chars[..shared_len].iter().collect()
}

fn common_tokens<'a>(token_rows: &[&'a [Token]]) -> Vec<&'a str> {
    let Some(first) = token_rows.first() else {
        return Vec::new();
    };
    let mut ordered: Vec<&str> = Vec::new();
    for t in first.iter() {
        if !ordered.contains(&t.text.as_str()) {
            ordered.push(t.text.as_str());
        }
    }
    for row in &token_rows[1..] {
        let texts: std::collections::HashSet<&str> = row.iter().map(|t| t.text.as_str()).collect();
        ordered.retain(|t| texts.contains(t));
    }
    ordered
}

fn masks_for(text: &str, include: &[&str], exclude: &[Option<&str>]) -> (Bitset, Bitset) {
    let mut inc = Bitset::new(include.len());
    for (i, s) in include.iter().enumerate() {
        if glob::matches(text, s) {
            inc.set(i);
        }
    }
    let mut exc = Bitset::new(exclude.len());
    for (i, v) in exclude.iter().enumerate() {
        let hit = match v {
            None => true,
            Some(s) => glob::matches(text, s),
        };
        if hit {
            exc.set(i);
        }
    }
    (inc, exc)
}

/// Try to synthesize one pattern covering the union of `union_include`
/// without dropping any of it and without exceeding `max_exclude_popcount`.
fn try_merge(
    union_include: &Bitset,
    max_exclude_popcount: usize,
    include: &[&str],
    exclude: &[Option<&str>],
    include_tokens: &[Vec<Token>],
) -> Option<(String, Bitset, Bitset)> {
    let covered_idx: Vec<usize> = union_include.iter_ones().collect();
    if covered_idx.len() < 2 {
        return None;
    }
    let covered_items: Vec<&str> = covered_idx.iter().map(|&i| include[i]).collect();
    let covered_tokens: Vec<&[Token]> = covered_idx.iter().map(|&i| include_tokens[i].as_slice()).collect();

    let mut attempts: Vec<String> = Vec::new();

    let prefix = longest_common_prefix(&covered_items);
    if !prefix.is_empty() {
        attempts.push(format!("{}*", prefix));
    }

    let common = common_tokens(&covered_tokens);
    for tok in &common {
        attempts.push(format!("*{}*", tok));
    }
    if common.len() >= 2 {
        let mut text = String::from("*");
        for tok in &common {
            text.push_str(tok);
            text.push('*');
        }
        attempts.push(text);
    }

    for text in attempts {
        let (inc, exc) = masks_for(&text, include, exclude);
        let covers_all = covered_idx.iter().all(|&i| inc.get(i));
        if covers_all && exc.popcount() <= max_exclude_popcount {
            return Some((text, inc, exc));
        }
    }
    None
}

fn candidate_for(text: String, field: Option<String>) -> Candidate {
    let (kind, wildcards, length) = crate::candidate::classify(&text);
    Candidate {
        text,
        kind,
        wildcards,
        length,
        field,
        score: 0.0,
    }
}

/// One round-trip result: the pair of chosen-list positions that were
/// merged and the synthesized replacement.
pub struct Merge {
    pub replaced: (usize, usize),
    pub candidate: Candidate,
    pub include_mask: Bitset,
    pub exclude_mask: Bitset,
}

/// Outcome of a full refinement run.
pub struct Refinement {
    /// Final chosen index list. Indices `< candidates.len()` refer to the
    /// caller's pool; indices `>= candidates.len()` refer to `merges[i -
    /// candidates.len()].candidate` (synthesized, in the order returned).
    pub final_chosen: Vec<usize>,
    pub merges: Vec<Merge>,
}

/// Repeatedly try to collapse pairs of chosen candidates into one until no
/// more merges are found. `chosen` holds indices into `candidates`/`coverage`.
/// Each synthesized replacement is assigned the index
/// `candidates.len() + merges.len()` at the time it is created, so callers
/// can extend their own pool with `merges[i].candidate` in return order and
/// have `final_chosen` line up against `candidates` followed by that
/// extension.
#[must_use]
pub fn refine(
    chosen: &[usize],
    candidates: &[Candidate],
    coverage: &[Coverage],
    include: &[&str],
    exclude: &[Option<&str>],
    include_tokens: &[Vec<Token>],
) -> Refinement {
    let mut merges = Vec::new();
    let mut current: Vec<usize> = chosen.to_vec();
    let mut synthetic: Vec<(Candidate, Bitset, Bitset)> = Vec::new();

    loop {
        let mut found = None;

        'search: for i in 0..current.len() {
            for j in (i + 1)..current.len() {
                let (inc_i, exc_i) = coverage_for(current[i], candidates, coverage, &synthetic);
                let (inc_j, exc_j) = coverage_for(current[j], candidates, coverage, &synthetic);
                let union_include = inc_i.or(&inc_j);
                let union_exclude = exc_i.or(&exc_j);
                let field = field_for(current[i], candidates, &synthetic);

                if let Some((text, inc, exc)) = try_merge(&union_include, union_exclude.popcount(), include, exclude, include_tokens) {
                    found = Some((i, j, text, inc, exc, field));
                    break 'search;
                }
            }
        }

        match found {
            Some((i, j, text, inc, exc, field)) => {
                let cand = candidate_for(text, field);
                let new_idx = candidates.len() + synthetic.len();
                synthetic.push((cand.clone(), inc.clone(), exc.clone()));

                merges.push(Merge {
                    replaced: (current[i], current[j]),
                    candidate: cand,
                    include_mask: inc,
                    exclude_mask: exc,
                });

                let mut next = Vec::with_capacity(current.len() - 1);
                for (k, &idx) in current.iter().enumerate() {
                    if k != i && k != j {
                        next.push(idx);
                    }
                }
                next.push(new_idx);
                current = next;
            }
            None => break,
        }
    }

    Refinement {
        final_chosen: current,
        merges,
    }
}

fn coverage_for(
    idx: usize,
    candidates: &[Candidate],
    coverage: &[Coverage],
    synthetic: &[(Candidate, Bitset, Bitset)],
) -> (Bitset, Bitset) {
    if idx < candidates.len() {
        (coverage[idx].include_mask.clone(), coverage[idx].exclude_mask.clone())
    } else {
        let (_, inc, exc) = &synthetic[idx - candidates.len()];
        (inc.clone(), exc.clone())
    }
}

fn field_for(idx: usize, candidates: &[Candidate], synthetic: &[(Candidate, Bitset, Bitset)]) -> Option<String> {
    if idx < candidates.len() {
        candidates[idx].field.clone()
    } else {
        synthetic[idx - candidates.len()].0.field.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::types::{PatternKind, TokenizerConfig};

    fn toks(s: &str) -> Vec<Token> {
        tokenize(s, &TokenizerConfig::default())
    }

    fn cand(text: &str, kind: PatternKind) -> Candidate {
        Candidate {
            text: text.to_string(),
            kind,
            wildcards: text.chars().filter(|&c| c == '*').count(),
            length: text.chars().filter(|&c| c != '*').count(),
            field: None,
            score: 0.0,
        }
    }

    #[test]
    fn merges_pair_sharing_common_token() {
        let include = vec!["cache/bank0", "cache/bank1"];
        let exclude: Vec<Option<&str>> = vec![];
        let include_tokens = vec![toks(include[0]), toks(include[1])];

        let candidates = vec![cand("*bank0", PatternKind::Suffix), cand("*bank1", PatternKind::Suffix)];
        let coverage = vec![
            Coverage {
                include_mask: { let mut b = Bitset::new(2); b.set(0); b },
                exclude_mask: Bitset::new(0),
            },
            Coverage {
                include_mask: { let mut b = Bitset::new(2); b.set(1); b },
                exclude_mask: Bitset::new(0),
            },
        ];

        let result = refine(&[0, 1], &candidates, &coverage, &include, &exclude, &include_tokens);
        assert_eq!(result.merges.len(), 1);
        assert_eq!(result.final_chosen, vec![2]);
        assert!(result.merges[0].include_mask.equal_all_ones());
        assert_eq!(result.merges[0].exclude_mask.popcount(), 0);
    }

    #[test]
    fn no_merge_when_no_safe_replacement_exists() {
        let include = vec!["alpha/x", "beta/y"];
        let exclude: Vec<Option<&str>> = vec![];
        let include_tokens = vec![toks(include[0]), toks(include[1])];

        let candidates = vec![cand("alpha*", PatternKind::Prefix), cand("beta*", PatternKind::Prefix)];
        let coverage = vec![
            Coverage {
                include_mask: { let mut b = Bitset::new(2); b.set(0); b },
                exclude_mask: Bitset::new(0),
            },
            Coverage {
                include_mask: { let mut b = Bitset::new(2); b.set(1); b },
                exclude_mask: Bitset::new(0),
            },
        ];

        let result = refine(&[0, 1], &candidates, &coverage, &include, &exclude, &include_tokens);
        assert!(result.merges.is_empty());
        assert_eq!(result.final_chosen, vec![0, 1]);
    }

    #[test]
    fn single_chosen_pattern_never_merges() {
        let include = vec!["alpha/x"];
        let exclude: Vec<Option<&str>> = vec![];
        let include_tokens = vec![toks(include[0])];
        let candidates = vec![cand("alpha*", PatternKind::Prefix)];
        let coverage = vec![Coverage {
            include_mask: { let mut b = Bitset::new(1); b.set(0); b },
            exclude_mask: Bitset::new(0),
        }];
        let result = refine(&[0], &candidates, &coverage, &include, &exclude, &include_tokens);
        assert!(result.merges.is_empty());
        assert_eq!(result.final_chosen, vec![0]);
    }
}
