//! Match candidates and where they occur in a sentence

use regex::{escape, Regex};
use splfacts_domain::{ConceptType, MatchClass};

/// Byte range of one occurrence inside a folded sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Start offset
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Up to `width` bytes before the span, clamped to a char boundary
    pub fn before<'a>(&self, sentence: &'a str, width: usize) -> &'a str {
        let from = floor_boundary(sentence, self.start.saturating_sub(width));
        &sentence[from..self.start]
    }

    /// Up to `width` bytes after the span, clamped to a char boundary
    pub fn after<'a>(&self, sentence: &'a str, width: usize) -> &'a str {
        let to = ceil_boundary(sentence, self.end.saturating_add(width));
        &sentence[self.end..to]
    }

    /// The span widened by `width` bytes on both sides
    pub fn around<'a>(&self, sentence: &'a str, width: usize) -> &'a str {
        let from = floor_boundary(sentence, self.start.saturating_sub(width));
        let to = ceil_boundary(sentence, self.end.saturating_add(width));
        &sentence[from..to]
    }
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Ids found for a key under one concept type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHit {
    /// Concept type of the index entry
    pub tty: ConceptType,
    /// Atom ids in dictionary order
    pub auis: Vec<String>,
}

/// A dictionary key found in a sentence
///
/// `spans` lists the occurrences still considered live. An empty list means
/// the key could not be located in the sentence text (typical for stemmed
/// keys spanning removed stopwords); such candidates are left to the other
/// stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Matched key as stored in the index
    pub key: String,
    /// Hits per concept type, in lookup order
    pub hits: Vec<TypeHit>,
    /// Live occurrences
    pub spans: Vec<Span>,
    /// Index the key came from
    pub class: MatchClass,
    /// Whether the key could be located at all
    pub located: bool,
}

impl Candidate {
    /// Create a candidate and locate its occurrences in the sentence
    pub fn new(key: impl Into<String>, class: MatchClass, sentence: &str) -> Self {
        let key = key.into();
        let spans = locate_spans(sentence, &key);
        Self {
            located: !spans.is_empty(),
            key,
            hits: Vec::new(),
            spans,
            class,
        }
    }

    /// Record ids under a concept type; ids already recorded for that type
    /// are not repeated
    pub fn add_hit(&mut self, tty: ConceptType, auis: &[String]) {
        match self.hits.iter_mut().find(|h| h.tty == tty) {
            Some(hit) => {
                for aui in auis {
                    if !hit.auis.contains(aui) {
                        hit.auis.push(aui.clone());
                    }
                }
            }
            None => self.hits.push(TypeHit {
                tty,
                auis: auis.to_vec(),
            }),
        }
    }

    /// Token count of the key
    pub fn token_len(&self) -> usize {
        self.key.split_whitespace().count()
    }

    /// Key tokens
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.key.split_whitespace()
    }

    /// Whether any occurrence is still live, or the key was never located
    pub fn is_live(&self) -> bool {
        !self.located || !self.spans.is_empty()
    }

    /// Atom ids across every hit, ordered by hit then dictionary order,
    /// without repeats
    pub fn atom_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for hit in &self.hits {
            for aui in &hit.auis {
                if !ids.contains(aui) {
                    ids.push(aui.clone());
                }
            }
        }
        ids
    }
}

/// Find every occurrence of a key in a folded sentence.
///
/// Whole-word literal occurrences are preferred. When there are none, each
/// key token is matched as a word prefix with any non-word run between
/// tokens, which locates stemmed keys ("bilirubin increas") and keys whose
/// punctuation was cleaned away ("kaposi s sarcoma").
pub fn locate_spans(sentence: &str, key: &str) -> Vec<Span> {
    let literal = literal_spans(sentence, key);
    if !literal.is_empty() {
        return literal;
    }

    let tokens: Vec<String> = key.split_whitespace().map(escape).collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let pattern = tokens
        .iter()
        .map(|t| format!(r"\b{}\w*", t))
        .collect::<Vec<_>>()
        .join(r"\W+");

    match Regex::new(&pattern) {
        Ok(re) => re
            .find_iter(sentence)
            .map(|m| Span::new(m.start(), m.end()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn literal_spans(sentence: &str, key: &str) -> Vec<Span> {
    if key.is_empty() {
        return Vec::new();
    }
    let is_word = |c: char| c.is_alphanumeric();
    sentence
        .match_indices(key)
        .filter(|(start, _)| {
            let end = start + key.len();
            let before_ok = sentence[..*start].chars().next_back().is_none_or(|c| !is_word(c));
            let after_ok = sentence[end..].chars().next().is_none_or(|c| !is_word(c));
            before_ok && after_ok
        })
        .map(|(start, _)| Span::new(start, start + key.len()))
        .collect()
}
