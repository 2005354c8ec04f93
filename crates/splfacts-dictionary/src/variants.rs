//! Alternate surface forms indexed alongside a term's own key
//!
//! Labels rarely print a vocabulary term the way the vocabulary spells it:
//! "increased ALT" for "ALT increased", "AIDS-related Kaposi's sarcoma" for
//! "Kaposi's sarcoma AIDS related", "ovarian cancer" for "cancer of the
//! ovary". Every function here works on normalized keys and returns `None`
//! when the rule does not apply.

use std::collections::BTreeMap;

use crate::config::DictionaryConfig;

/// Move a leading or trailing direction keyword to the other end
pub fn reverse_keyword(key: &str, keywords: &[String]) -> Option<String> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    let is_keyword = |t: &str| keywords.iter().any(|k| k == t);

    let last = tokens[tokens.len() - 1];
    if is_keyword(last) {
        let mut rotated = vec![last];
        rotated.extend_from_slice(&tokens[..tokens.len() - 1]);
        return Some(rotated.join(" "));
    }
    if is_keyword(tokens[0]) {
        let mut rotated = tokens[1..].to_vec();
        rotated.push(tokens[0]);
        return Some(rotated.join(" "));
    }
    None
}

/// Bring a trailing "<qualifier> <relation>" pair to the front.
///
/// Applies to terms of three or more tokens whose penultimate token is a
/// qualifier and whose last token starts with one of the relation tails.
pub fn rotate_qualifier(key: &str, qualifiers: &[String], tails: &[String]) -> Option<String> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    let n = tokens.len();
    if n < 3 {
        return None;
    }
    let qualifier = tokens[n - 2];
    let relation = tokens[n - 1];
    if !qualifiers.iter().any(|q| q == qualifier)
        || !tails.iter().any(|t| relation.starts_with(t.as_str()))
    {
        return None;
    }

    let mut rotated = vec![qualifier, relation];
    rotated.extend_from_slice(&tokens[..n - 2]);
    Some(rotated.join(" "))
}

/// Rewrite "X of the Y" as "adj(Y) X" when Y is a known organ
pub fn rotate_organ(key: &str, adjectives: &BTreeMap<String, String>) -> Option<String> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    let n = tokens.len();
    if n < 4 || tokens[n - 3] != "of" || tokens[n - 2] != "the" {
        return None;
    }
    let adjective = adjectives.get(tokens[n - 1])?;

    let mut rotated = vec![adjective.as_str()];
    rotated.extend_from_slice(&tokens[..n - 3]);
    Some(rotated.join(" "))
}

/// Every distinct variant of a key under the configured rules, in rule
/// order; the key itself is never included
pub fn variants(key: &str, config: &DictionaryConfig) -> Vec<String> {
    let candidates = [
        reverse_keyword(key, &config.reversible_keywords),
        rotate_qualifier(key, &config.qualifier_tokens, &config.qualifier_tails),
        rotate_organ(key, &config.organ_adjectives),
    ];

    let mut out: Vec<String> = Vec::new();
    for variant in candidates.into_iter().flatten() {
        if variant != key && !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}
