//! Text normalization shared by dictionary keys and match-time text
//!
//! Both sides of a lookup must go through the same functions, otherwise
//! keys and n-grams drift apart.

use std::sync::LazyLock;

use regex::Regex;
use splfacts_domain::traits::Tokenizer;

/// Fixed rewrite patterns shared by every normalization call
#[derive(Debug)]
pub struct TextPatterns {
    possessive: Regex,
    spaced_joiner: Regex,
    percent_paren: Regex,
}

impl TextPatterns {
    /// Compile the rewrite patterns
    pub fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            possessive: Regex::new(r"\s*'\s*s\b")?,
            spaced_joiner: Regex::new(r"\s+(['-])\s+")?,
            percent_paren: Regex::new(r"\(\d+(?:\.\d+)?%\)")?,
        })
    }

    /// Shared compiled patterns, or the compile error
    pub fn shared() -> Result<&'static TextPatterns, &'static regex::Error> {
        static PATTERNS: LazyLock<Result<TextPatterns, regex::Error>> = LazyLock::new(TextPatterns::compile);
        PATTERNS.as_ref()
    }
}

/// Fold typographic punctuation to ASCII.
///
/// Smart quotes become `'`/`"`, en/em/minus dashes become `-`, non-breaking
/// spaces and control characters become plain spaces. A possessive `'s` is
/// re-attached to its word and a hyphen between two letters is split into
/// a space ("aids-related" → "aids related").
pub fn normalize_punct(s: &str) -> String {
    let folded: String = s
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let Ok(patterns) = TextPatterns::shared() else {
        return split_letter_hyphens(&folded);
    };
    let joined = patterns.possessive.replace_all(&folded, "'s");
    let split = split_letter_hyphens(&joined);
    patterns.spaced_joiner.replace_all(&split, "$1").into_owned()
}

/// Replace `-` with a space when both neighbours are letters
fn split_letter_hyphens(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        let between_letters = c == '-'
            && i > 0
            && chars[i - 1].is_alphabetic()
            && chars.get(i + 1).is_some_and(|n| n.is_alphabetic());
        out.push(if between_letters { ' ' } else { c });
    }
    out
}

/// Fold a sentence for context checks: punctuation folding, lowercase, trim
pub fn fold_sentence(s: &str) -> String {
    normalize_punct(s).to_lowercase().trim().to_string()
}

/// Reduce text to the key alphabet `[a-z0-9 -]`.
///
/// Every other character becomes a space, whitespace runs collapse, and
/// tokens made only of hyphens are dropped.
pub fn clean_text(s: &str) -> String {
    let mapped: String = s
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    mapped
        .split_whitespace()
        .filter(|t| !t.chars().all(|c| c == '-'))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full key normalization: punctuation folding followed by cleaning
pub fn normalize_term(s: &str) -> String {
    clean_text(&normalize_punct(s))
}

/// Remove bracketed percentages like "(12.5%)" that pepper adverse
/// reaction tables, then collapse whitespace
pub fn strip_percentages(s: &str) -> String {
    let stripped = match TextPatterns::shared() {
        Ok(patterns) => patterns.percent_paren.replace_all(s, " "),
        Err(_) => s.into(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace token count of a key
pub fn token_count(key: &str) -> usize {
    key.split_whitespace().count()
}

/// Tokenizer over normalized keys: whitespace split after [`normalize_term`]
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyTokenizer;

impl Tokenizer for KeyTokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        normalize_term(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: normalizing a key twice changes nothing
        #[test]
        fn test_normalize_term_idempotent(s in "\\PC{0,60}") {
            let once = normalize_term(&s);
            prop_assert_eq!(normalize_term(&once), once.clone());
        }

        /// Property: normalized keys only use the key alphabet
        #[test]
        fn test_normalized_alphabet(s in "\\PC{0,60}") {
            let key = normalize_term(&s);
            prop_assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ' || c == '-'));
            prop_assert!(!key.contains("  "));
        }
    }
}
