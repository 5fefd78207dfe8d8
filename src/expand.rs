//! Pattern specialization / "honing in" (`spec.md` §4.7).
//!
//! After selection but before refinement, each chosen pattern is tried
//! against longer, delimiter-bounded prefixes of its covered items' common
//! prefix: growing the literal anchor can only ever shrink a pattern's
//! match set (it is always at least as specific), so the search is safe by
//! construction — the only question is how far to grow without dropping
//! any item the pattern currently covers or gaining new false positives.
//! `Suffix` candidates get the mirrored treatment, growing backward from
//! the common suffix instead.

use crate::bitset::Bitset;
use crate::candidate::Candidate;
use crate::coverage::Coverage;
use crate::glob;
use crate::types::PatternKind;

const MAX_DELIMITERS: usize = 10;

fn is_delimiter(c: char) -> bool {
    !c.is_alphanumeric()
}

fn longest_common_prefix(items: &[&str]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let mut prefix_len_chars = first.chars().count();
    let first_chars: Vec<char> = first.chars().collect();

    for item in &items[1..] {
        let mut shared = 0;
        for (a, b) in first_chars.iter().zip(item.chars()) {
            if *a == b {
                shared += 1;
            } else {
                break;
            }
        }
        prefix_len_chars = prefix_len_chars.min(shared);
    }

    first_chars[..prefix_len_chars].iter().collect()
}

/// Delimiter-bounded truncation points of `prefix`, longest first, capped
/// at `MAX_DELIMITERS`.
fn delimiter_positions(prefix: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut running = 0usize;
    for c in prefix.chars() {
        running += c.len_utf8();
        if is_delimiter(c) {
            positions.push(running);
        }
    }
    positions.reverse();
    positions.truncate(MAX_DELIMITERS);
    positions
}

fn longest_common_suffix(items: &[&str]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let first_chars: Vec<char> = first.chars().collect();
    let mut shared_len = first_chars.len();

    for item in &items[1..] {
        let item_chars: Vec<char> = item.chars().collect();
        let mut shared = 0;
        for (a, b) in first_chars.iter().rev().zip(item_chars.iter().rev()) {
            if *a == b {
                shared += 1;
            } else {
                break;
            }
        }
        shared_len = shared_len.min(shared);
    }

    first_chars[first_chars.len() - shared_len..].iter().collect()
}

/// Byte offsets into `suffix` right after a delimiter character, smallest
/// (longest kept suffix) first, capped at `MAX_DELIMITERS`. Mirrors
/// `delimiter_positions`, but truncation grows the anchor backward from the
/// end of the string rather than forward from the start.
fn delimiter_positions_suffix(suffix: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut offset = 0usize;
    for c in suffix.chars() {
        let next = offset + c.len_utf8();
        if is_delimiter(c) {
            positions.push(next);
        }
        offset = next;
    }
    positions.truncate(MAX_DELIMITERS);
    positions
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

/// Try each candidate text in order, returning the first that keeps every
/// item `original_include` covers and does not raise the false-positive
/// count above `original_exclude`'s.
fn try_candidates(
    candidate_texts: impl Iterator<Item = String>,
    original_text: &str,
    original_include: &Bitset,
    original_exclude: &Bitset,
    include: &[&str],
    exclude: &[Option<&str>],
) -> Option<(String, Bitset, Bitset)> {
    for candidate_text in candidate_texts {
        if candidate_text == original_text || glob::is_bare_wildcard(&candidate_text) {
            continue;
        }
        let (inc, exc) = masks_for(&candidate_text, include, exclude);

        let drops_coverage = original_include.iter_ones().any(|i| !inc.get(i));
        let worsens_fp = exc.popcount() > original_exclude.popcount();

        if !drops_coverage && !worsens_fp {
            return Some((candidate_text, inc, exc));
        }
        // This position changed coverage/FP unfavorably; try the next
        // (shorter) delimiter-bounded position.
    }

    None
}

/// Attempt to specialize one chosen `Prefix`/`Exact` candidate in place by
/// growing its anchor forward from the common prefix of its covered items.
fn expand_one(
    original_text: &str,
    original_include: &Bitset,
    original_exclude: &Bitset,
    include: &[&str],
    exclude: &[Option<&str>],
) -> Option<(String, Bitset, Bitset)> {
    let covered: Vec<&str> = original_include
        .iter_ones()
        .map(|i| include[i])
        .collect();

    if covered.len() < 2 {
        return None;
    }

    let prefix = longest_common_prefix(&covered);
    if prefix.is_empty() {
        return None;
    }

    let positions = delimiter_positions(&prefix);
    let texts = positions.into_iter().map(|pos| format!("{}*", &prefix[..pos]));
    try_candidates(texts, original_text, original_include, original_exclude, include, exclude)
}

/// Attempt to specialize one chosen `Suffix` candidate in place by growing
/// its anchor backward from the common suffix of its covered items — the
/// mirror image of `expand_one`.
fn expand_suffix_one(
    original_text: &str,
    original_include: &Bitset,
    original_exclude: &Bitset,
    include: &[&str],
    exclude: &[Option<&str>],
) -> Option<(String, Bitset, Bitset)> {
    let covered: Vec<&str> = original_include
        .iter_ones()
        .map(|i| include[i])
        .collect();

    if covered.len() < 2 {
        return None;
    }

    let suffix = longest_common_suffix(&covered);
    if suffix.is_empty() {
        return None;
    }

    let positions = delimiter_positions_suffix(&suffix);
    let texts = positions
        .into_iter()
        .filter(|&pos| pos < suffix.len())
        .map(|pos| format!("*{}", &suffix[pos..]));
    try_candidates(texts, original_text, original_include, original_exclude, include, exclude)
}

/// Run expansion over every chosen candidate, returning updated
/// (text, kind, wildcards, length, include_mask, exclude_mask) for any
/// pattern that was successfully specialized. Entries that did not change
/// are omitted.
pub struct Expansion {
    pub chosen_index: usize,
    pub text: String,
    pub include_mask: Bitset,
    pub exclude_mask: Bitset,
}

#[must_use]
pub fn expand(
    chosen: &[usize],
    candidates: &[Candidate],
    coverage: &[Coverage],
    include: &[&str],
    exclude: &[Option<&str>],
) -> Vec<Expansion> {
    let mut out = Vec::new();
    for &idx in chosen {
        let cand = &candidates[idx];
        let cov = &coverage[idx];
        let specialized = match cand.kind {
            PatternKind::Prefix | PatternKind::Exact => expand_one(&cand.text, &cov.include_mask, &cov.exclude_mask, include, exclude),
            PatternKind::Suffix => expand_suffix_one(&cand.text, &cov.include_mask, &cov.exclude_mask, include, exclude),
            PatternKind::Substring | PatternKind::Multi => None,
        };
        if let Some((text, inc, exc)) = specialized {
            out.push(Expansion {
                chosen_index: idx,
                text,
                include_mask: inc,
                exclude_mask: exc,
            });
        }
    }
    out
}
