//! Antonym lexicon, indexed both as written and stemmed

use std::collections::{HashMap, HashSet};
use std::path::Path;

use splfacts_dictionary::normalize::normalize_term;
use splfacts_dictionary::stem_phrase;
use splfacts_domain::traits::Stemmer;
use tracing::{debug, warn};

use crate::error::Result;
use crate::lexicon::TermPair;

/// Minimum column count of an antonym table row
const MIN_COLUMNS: usize = 10;

/// Symmetric antonym relation over normalized and stemmed terms
#[derive(Debug, Clone, Default)]
pub struct AntonymLexicon {
    exact: HashMap<String, HashSet<String>>,
    stemmed: HashMap<String, HashSet<String>>,
}

impl AntonymLexicon {
    /// Create an empty lexicon
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured pairs
    pub fn from_pairs<S: Stemmer + ?Sized>(pairs: &[TermPair], stemmer: &S) -> Self {
        let mut lexicon = Self::new();
        for pair in pairs {
            lexicon.insert(&pair.term, &pair.opposite, stemmer);
        }
        lexicon
    }

    /// Add a pair. Blank or identical terms are ignored.
    pub fn insert<S: Stemmer + ?Sized>(&mut self, a: &str, b: &str, stemmer: &S) -> bool {
        let a = normalize_term(a);
        let b = normalize_term(b);
        if a.is_empty() || b.is_empty() || a == b {
            return false;
        }
        let sa = stem_phrase(stemmer, &a);
        let sb = stem_phrase(stemmer, &b);

        link(&mut self.exact, a, b);
        link(&mut self.stemmed, sa, sb);
        true
    }

    /// Load pairs from a pipe-separated antonym table.
    ///
    /// Antonyms sit in the first and third columns. Comment lines, the
    /// header row and rows with fewer than ten columns are skipped.
    pub fn load_table<P: AsRef<Path>, S: Stemmer + ?Sized>(&mut self, path: P, stemmer: &S) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let added = self.load_table_str(&content, stemmer);
        debug!("Loaded {} antonym pairs from {}", added, path.display());
        Ok(added)
    }

    /// Parse antonym table content
    pub fn load_table_str<S: Stemmer + ?Sized>(&mut self, content: &str, stemmer: &S) -> usize {
        let mut added = 0;
        let mut short_rows = 0;
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.to_lowercase().starts_with("ant-1|eui-1|ant-2|eui-2") {
                continue;
            }
            let columns: Vec<&str> = line.split('|').collect();
            if columns.len() < MIN_COLUMNS {
                short_rows += 1;
                continue;
            }
            if self.insert(columns[0], columns[2], stemmer) {
                added += 1;
            }
        }
        if short_rows > 0 {
            warn!("Skipped {} short antonym rows", short_rows);
        }
        added
    }

    /// Whether two keys are antonyms in either index
    pub fn are_antonyms(&self, a: &str, b: &str) -> bool {
        related(&self.exact, a, b) || related(&self.stemmed, a, b)
    }

    /// Number of distinct terms with at least one antonym
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Whether the lexicon is empty
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

fn link(index: &mut HashMap<String, HashSet<String>>, a: String, b: String) {
    index.entry(a.clone()).or_default().insert(b.clone());
    index.entry(b).or_default().insert(a);
}

fn related(index: &HashMap<String, HashSet<String>>, a: &str, b: &str) -> bool {
    index.get(a).is_some_and(|set| set.contains(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splfacts_dictionary::SnowballStemmer;

    #[test]
    fn test_pairs_are_symmetric_and_stemmed() {
        let stemmer = SnowballStemmer::english();
        let lexicon = AntonymLexicon::from_pairs(
            &[TermPair {
                term: "Hypertension".to_string(),
                opposite: "hypotension".to_string(),
            }],
            &stemmer,
        );
        assert!(lexicon.are_antonyms("hypertension", "hypotension"));
        assert!(lexicon.are_antonyms("hypotension", "hypertension"));
        assert!(lexicon.are_antonyms(&stemmer.stem_phrase("hypotension"), &stemmer.stem_phrase("hypertension")));
        assert!(!lexicon.are_antonyms("hypertension", "rash"));
    }

    #[test]
    fn test_table_parsing() {
        let stemmer = SnowballStemmer::english();
        let mut lexicon = AntonymLexicon::new();
        let content = "\
ANT-1|EUI-1|ANT-2|EUI-2|CAT-1|CAT-2|TYPE|DOMAIN|SOURCE|NOTE
# comment
active|E0006|inactive|E0034|adj|adj|NA|GENERAL|MANUAL|x
short|row|only
same|E1|same|E1|adj|adj|NA|GENERAL|MANUAL|x
";
        assert_eq!(lexicon.load_table_str(content, &stemmer), 1);
        assert!(lexicon.are_antonyms("inactive", "active"));
        assert_eq!(lexicon.len(), 2);
    }

    #[test]
    fn test_load_table_from_file() {
        let stemmer = SnowballStemmer::english();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AM.DB");
        std::fs::write(&path, "tachycardia|E1|bradycardia|E2|n|n|NA|BIO|MANUAL|x\n").unwrap();

        let mut lexicon = AntonymLexicon::new();
        assert_eq!(lexicon.load_table(&path, &stemmer).unwrap(), 1);
        assert!(lexicon.are_antonyms("bradycardia", "tachycardia"));
        assert!(lexicon.load_table(dir.path().join("missing"), &stemmer).is_err());
    }
}
