//! Stopword phrases for the non-exact pass

use std::collections::HashSet;
use std::path::Path;

use splfacts_domain::traits::StopwordPredicate;

use crate::error::Result;
use crate::normalize::clean_text;

/// Set of single- and multi-word stop phrases
#[derive(Debug, Clone, Default)]
pub struct StopwordList {
    phrases: HashSet<Vec<String>>,
    max_phrase_len: usize,
}

impl StopwordList {
    /// Build from phrases; optionally include every single letter a-z
    pub fn new<I, S>(phrases: I, single_letters: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            phrases: HashSet::new(),
            max_phrase_len: 1,
        };
        if single_letters {
            for ch in 'a'..='z' {
                list.insert(&ch.to_string());
            }
        }
        for phrase in phrases {
            list.insert(phrase.as_ref());
        }
        list
    }

    /// Load phrases from a file, one per line. Blank lines and lines
    /// starting with `#` are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P, single_letters: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(&content, single_letters))
    }

    /// Parse phrases from file content
    pub fn from_lines(content: &str, single_letters: bool) -> Self {
        let lines = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        Self::new(lines, single_letters)
    }

    fn insert(&mut self, phrase: &str) {
        let tokens: Vec<String> = phrase
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            return;
        }
        self.max_phrase_len = self.max_phrase_len.max(tokens.len());
        self.phrases.insert(tokens);
    }

    /// Number of phrases
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Whether the whole text is exactly one stop phrase
    pub fn is_stop_phrase(&self, text: &str) -> bool {
        let tokens: Vec<String> = text
            .trim()
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        !tokens.is_empty() && self.phrases.contains(&tokens)
    }

    /// Remove stop phrases from text.
    ///
    /// The text is cleaned to the key alphabet first. Windows are blanked
    /// greedily from the longest phrase length down to single tokens.
    pub fn remove_stopwords(&self, text: &str) -> String {
        let cleaned = clean_text(text);
        let mut tokens: Vec<Option<&str>> = cleaned.split_whitespace().map(Some).collect();

        for n in (1..=self.max_phrase_len).rev() {
            if tokens.len() < n {
                continue;
            }
            for i in 0..=tokens.len() - n {
                let window = &tokens[i..i + n];
                if window.iter().any(Option::is_none) {
                    continue;
                }
                let phrase: Vec<String> = window.iter().flatten().map(|t| t.to_string()).collect();
                if self.phrases.contains(&phrase) {
                    for slot in &mut tokens[i..i + n] {
                        *slot = None;
                    }
                }
            }
        }

        tokens.into_iter().flatten().collect::<Vec<_>>().join(" ")
    }
}

impl StopwordPredicate for StopwordList {
    fn is_stopword(&self, token: &str) -> bool {
        self.phrases.contains(&vec![token.to_lowercase()])
    }
}
