//! Deterministic tokenization (`spec.md` §4.2).
//!
//! Segments a normalized string into `Token`s, preserving original split
//! order and merging sub-minimum tokens with their successor, delimiter
//! characters included, so every merged token literally occurs in the
//! source string.

use crate::types::{SplitMethod, Token, TokenizerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Alpha,
    Digit,
    Other,
}

fn classify(c: char) -> CharClass {
    if c.is_alphabetic() {
        CharClass::Alpha
    } else if c.is_numeric() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

/// A raw split before drop/merge, carrying its byte span in the
/// lower-cased source so merges can recover literal delimiter text.
struct RawSpan {
    start: usize,
    end: usize,
    original_index: usize,
}

fn raw_split_classchange(lower: &str) -> Vec<RawSpan> {
    let mut spans = Vec::new();
    let mut chars = lower.char_indices().peekable();
    let mut seg_start: Option<usize> = None;
    let mut seg_class: Option<CharClass> = None;
    let mut ordinal = 0usize;

    let mut push_seg = |end: usize, seg_start: &mut Option<usize>, ordinal: &mut usize| {
        if let Some(start) = seg_start.take() {
            spans.push(RawSpan {
                start,
                end,
                original_index: *ordinal,
            });
            *ordinal += 1;
        }
    };

    while let Some(&(idx, c)) = chars.peek() {
        let class = classify(c);
        match seg_class {
            None => {
                seg_start = Some(idx);
                seg_class = Some(class);
            }
            Some(cur) if cur != class => {
                push_seg(idx, &mut seg_start, &mut ordinal);
                seg_start = Some(idx);
                seg_class = Some(class);
            }
            _ => {}
        }
        chars.next();
    }
    push_seg(lower.len(), &mut seg_start, &mut ordinal);
    spans
}

fn raw_split_char(lower: &str) -> Vec<RawSpan> {
    lower
        .char_indices()
        .enumerate()
        .map(|(ordinal, (idx, c))| RawSpan {
            start: idx,
            end: idx + c.len_utf8(),
            original_index: ordinal,
        })
        .collect()
}

/// Tokenize `input` according to `config`.
///
/// Steps (see `spec.md` §4.2):
/// 1. lower-case
/// 2. raw-split by `split_method`
/// 3. drop single-character raw tokens under `classchange`
/// 4. merge sub-minimum tokens forward with the next kept token, including
///    the intervening delimiter text
#[must_use]
pub fn tokenize(input: &str, config: &TokenizerConfig) -> Vec<Token> {
    let lower = input.to_lowercase();
    let min_len = match config.split_method {
        SplitMethod::Char => 1,
        SplitMethod::ClassChange => config.min_token_len.max(1),
    };

    let raw = match config.split_method {
        SplitMethod::ClassChange => raw_split_classchange(&lower),
        SplitMethod::Char => raw_split_char(&lower),
    };

    let kept: Vec<RawSpan> = match config.split_method {
        SplitMethod::ClassChange => raw
            .into_iter()
            .filter(|s| lower[s.start..s.end].chars().count() > 1)
            .collect(),
        SplitMethod::Char => raw,
    };

    if kept.is_empty() {
        return Vec::new();
    }

    let mut tokens = Vec::with_capacity(kept.len());
    let mut i = 0usize;
    while i < kept.len() {
        let start = kept[i].start;
        let mut end = kept[i].end;
        let original_index = kept[i].original_index;
        let mut j = i;

        while lower[start..end].chars().count() < min_len && j + 1 < kept.len() {
            j += 1;
            end = kept[j].end;
        }

        tokens.push(Token {
            text: lower[start..end].to_string(),
            original_index,
        });
        i = j + 1;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(split: SplitMethod, min: usize) -> TokenizerConfig {
        TokenizerConfig {
            split_method: split,
            min_token_len: min,
        }
    }

    #[test]
    fn classchange_basic_path() {
        // "1" and "i"/"0" are each single-character raw segments and are
        // dropped under classchange before merge ever runs.
        let tokens = tokenize("alpha/module1/mem/i0", &cfg(SplitMethod::ClassChange, 1));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "module", "mem"]);
    }

    #[test]
    fn single_char_raw_tokens_dropped() {
        // "1" alone is a single-character raw token and is dropped before
        // merge ever runs, regardless of min_token_len.
        let tokens = tokenize("module1", &cfg(SplitMethod::ClassChange, 1));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["module"]);
    }

    #[test]
    fn merge_preserves_delimiters() {
        // "ab" (len 2) is below min_token_len=3, so it merges forward with
        // the next kept token "cd", absorbing the literal delimiter "/"
        // between them.
        let tokens = tokenize("ab/cd", &cfg(SplitMethod::ClassChange, 3));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "ab/cd");
        assert_eq!(tokens[0].original_index, 0);
        for t in &tokens {
            assert!(
                "ab/cd".contains(&t.text),
                "merged token {:?} must occur verbatim in source",
                t.text
            );
        }
    }

    #[test]
    fn char_mode_forces_min_len_one() {
        let tokens = tokenize("ab", &cfg(SplitMethod::Char, 5));
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].text, "b");
    }

    #[test]
    fn lowercases_input() {
        let tokens = tokenize("Alpha", &cfg(SplitMethod::ClassChange, 1));
        assert_eq!(tokens[0].text, "alpha");
    }

    #[test]
    fn original_index_ascending() {
        let tokens = tokenize("alpha/module1/mem/i0", &cfg(SplitMethod::ClassChange, 1));
        let indices: Vec<usize> = tokens.iter().map(|t| t.original_index).collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("", &cfg(SplitMethod::ClassChange, 1)).is_empty());
    }

    #[test]
    fn duplicate_token_texts_allowed() {
        let tokens = tokenize("cache/cache", &cfg(SplitMethod::ClassChange, 1));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["cache", "cache"]);
        assert_ne!(tokens[0].original_index, tokens[1].original_index);
    }
}
