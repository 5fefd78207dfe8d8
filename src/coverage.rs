//! Coverage engine: compute include/exclude hit masks for each candidate
//! (`spec.md` §4.4).
//!
//! Runs candidates data-parallel (independent of one another) via `rayon`'s
//! `par_iter`; the reduction back into an ordered `Vec` is a plain indexed
//! collect, which is deterministic regardless of worker scheduling
//! (`spec.md` §5).

use rayon::prelude::*;

use crate::bitset::Bitset;
use crate::candidate::Candidate;
use crate::glob;

/// One row's value for a single field. `None` means "don't care" and is
/// only meaningful for structured-mode exclude rows (`spec.md` §4.4, §4.8).
pub type FieldValue<'a> = Option<&'a str>;

/// Include/exclude hit masks for one candidate.
#[derive(Debug, Clone)]
pub struct Coverage {
    pub include_mask: Bitset,
    pub exclude_mask: Bitset,
}

/// Compute coverage for every candidate against `include` and `exclude`
/// row values. `include` values are always present (no don't-care concept
/// on includes); `exclude` values may be `None`.
#[must_use]
pub fn compute(candidates: &[Candidate], include: &[&str], exclude: &[FieldValue<'_>]) -> Vec<Coverage> {
    candidates
        .par_iter()
        .map(|c| {
            let mut include_mask = Bitset::new(include.len());
            for (i, s) in include.iter().enumerate() {
                if glob::matches(&c.text, s) {
                    include_mask.set(i);
                }
            }

            let mut exclude_mask = Bitset::new(exclude.len());
            for (i, v) in exclude.iter().enumerate() {
                let hit = match v {
                    None => true,
                    Some(s) => glob::matches(&c.text, s),
                };
                if hit {
                    exclude_mask.set(i);
                }
            }

            Coverage {
                include_mask,
                exclude_mask,
            }
        })
        .collect()
}
