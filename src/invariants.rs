//! Debug-mode invariant assertions for the solver pipeline.
//!
//! These checks verify properties `spec.md` §3 states as always-true, at
//! the seams where a bug would otherwise silently produce a subtly wrong
//! `Solution` (a bare wildcard, an EXACT-mode solution with false
//! positives, a coverage count outside its bound). Active only in debug
//! builds; no-ops in release so solving large inputs never pays for them.

use crate::bitset::Bitset;
use crate::types::Mode;

/// Asserts that no pattern text is a bare wildcard (`*`, `**`, ...) — every
/// candidate must literally match at least one concrete include item,
/// which a bare wildcard trivially violates by matching everything.
#[inline]
pub fn assert_no_bare_wildcard(text: &str) {
    #[cfg(debug_assertions)]
    {
        debug_assert!(
            !crate::glob::is_bare_wildcard(text),
            "invariant violation: pattern {text:?} is a bare wildcard"
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = text;
    }
}

/// Asserts that an EXACT-mode solution never carries false positives.
#[inline]
pub fn assert_exact_mode_zero_fp(mode: Mode, fp: usize) {
    #[cfg(debug_assertions)]
    {
        if mode == Mode::Exact {
            debug_assert_eq!(fp, 0, "invariant violation: EXACT mode solution has fp = {fp}");
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (mode, fp);
    }
}

/// Asserts that a coverage mask's popcount never exceeds its declared
/// length (catches an off-by-one in mask construction before it reaches
/// the selector's cost accounting).
#[inline]
pub fn assert_mask_bound(mask: &Bitset) {
    #[cfg(debug_assertions)]
    {
        debug_assert!(
            mask.popcount() <= mask.len(),
            "invariant violation: mask popcount {} exceeds length {}",
            mask.popcount(),
            mask.len()
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = mask;
    }
}

/// Asserts that a solution's reported `covered` count never exceeds
/// `total_positive` (`spec.md` §6 "Numeric semantics").
#[inline]
pub fn assert_covered_within_total(covered: usize, total_positive: usize) {
    #[cfg(debug_assertions)]
    {
        debug_assert!(
            covered <= total_positive,
            "invariant violation: covered {covered} > total_positive {total_positive}"
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (covered, total_positive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_wildcard_detection() {
        assert_no_bare_wildcard("*cache*");
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    #[cfg(debug_assertions)]
    fn bare_wildcard_panics() {
        assert_no_bare_wildcard("*");
    }

    #[test]
    fn exact_mode_zero_fp_passes() {
        assert_exact_mode_zero_fp(Mode::Exact, 0);
        assert_exact_mode_zero_fp(Mode::Approx, 3);
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    #[cfg(debug_assertions)]
    fn exact_mode_nonzero_fp_panics() {
        assert_exact_mode_zero_fp(Mode::Exact, 1);
    }

    #[test]
    fn mask_bound_passes_for_valid_mask() {
        let mut b = Bitset::new(5);
        b.set(0);
        b.set(4);
        assert_mask_bound(&b);
    }

    #[test]
    fn covered_within_total_passes() {
        assert_covered_within_total(3, 5);
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    #[cfg(debug_assertions)]
    fn covered_exceeding_total_panics() {
        assert_covered_within_total(6, 5);
    }
}
