//! Snowball English stemmer

use rust_stemmers::{Algorithm, Stemmer as Snowball};
use splfacts_domain::traits::Stemmer;

/// Snowball (Porter2) English stemmer
pub struct SnowballStemmer {
    inner: Snowball,
}

impl SnowballStemmer {
    /// Create an English stemmer
    pub fn english() -> Self {
        Self {
            inner: Snowball::create(Algorithm::English),
        }
    }

    /// Stem each whitespace token of a phrase
    pub fn stem_phrase(&self, phrase: &str) -> String {
        stem_phrase(self, phrase)
    }
}

impl Default for SnowballStemmer {
    fn default() -> Self {
        Self::english()
    }
}

impl std::fmt::Debug for SnowballStemmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SnowballStemmer(english)")
    }
}

impl Stemmer for SnowballStemmer {
    fn stem(&self, token: &str) -> String {
        self.inner.stem(token).into_owned()
    }
}

/// Stem each whitespace token of a phrase with any stemmer
pub fn stem_phrase<S: Stemmer + ?Sized>(stemmer: &S, phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|t| stemmer.stem(t))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_stems() {
        let stemmer = SnowballStemmer::english();
        assert_eq!(stemmer.stem("increased"), "increas");
        assert_eq!(stemmer.stem("reactions"), "reaction");
    }

    #[test]
    fn test_plural_and_singular_share_a_stem() {
        let stemmer = SnowballStemmer::english();
        assert_eq!(stemmer.stem_phrase("headaches"), stemmer.stem_phrase("headache"));
        assert_eq!(stemmer.stem_phrase("  lung   cancers "), "lung cancer");
    }
}
