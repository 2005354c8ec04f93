//! The built, read-only term dictionary

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use splfacts_domain::traits::Stemmer;
use splfacts_domain::{Atom, ConceptType, MatchClass};

use crate::normalize::token_count;
use crate::stemmer::stem_phrase;
use crate::stopwords::StopwordList;

/// One lookup index: concept type → token length → key → atom ids
///
/// Atom ids under a key keep insertion order and never repeat. The token
/// length of every entry equals the whitespace token count of its key.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    entries: BTreeMap<ConceptType, BTreeMap<usize, HashMap<String, Vec<String>>>>,
    max_len: usize,
    key_count: usize,
}

impl TermIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an atom id under a key. Blank keys are ignored.
    ///
    /// Returns true when the id was not already present under the key.
    pub fn insert(&mut self, tty: ConceptType, key: &str, aui: &str) -> bool {
        let len = token_count(key);
        if len == 0 {
            return false;
        }
        let by_key = self.entries.entry(tty).or_default().entry(len).or_default();
        if !by_key.contains_key(key) {
            self.key_count += 1;
        }
        let ids = by_key.entry(key.to_string()).or_default();
        if ids.iter().any(|id| id == aui) {
            return false;
        }
        ids.push(aui.to_string());
        self.max_len = self.max_len.max(len);
        true
    }

    /// Atom ids for a key of a known token length
    pub fn get(&self, tty: ConceptType, len: usize, key: &str) -> Option<&[String]> {
        self.entries
            .get(&tty)?
            .get(&len)?
            .get(key)
            .map(Vec::as_slice)
    }

    /// Atom ids for a key; the length is derived from the key
    pub fn lookup(&self, tty: ConceptType, key: &str) -> Option<&[String]> {
        self.get(tty, token_count(key), key)
    }

    /// Whether any concept type holds the key
    pub fn contains_key(&self, key: &str) -> bool {
        let len = token_count(key);
        self.entries
            .values()
            .any(|by_len| by_len.get(&len).is_some_and(|keys| keys.contains_key(key)))
    }

    /// Longest key, in tokens
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of distinct (type, key) entries
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Concept types with at least one entry
    pub fn types(&self) -> impl Iterator<Item = ConceptType> + '_ {
        self.entries.keys().copied()
    }

    /// Every `(type, length, key, ids)` entry
    pub fn iter(&self) -> impl Iterator<Item = (ConceptType, usize, &str, &[String])> + '_ {
        self.entries.iter().flat_map(|(tty, by_len)| {
            by_len.iter().flat_map(move |(len, keys)| {
                keys.iter()
                    .map(move |(key, ids)| (*tty, *len, key.as_str(), ids.as_slice()))
            })
        })
    }
}

/// Counters collected while building a dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Records yielded by the source
    pub records_read: usize,

    /// Atoms that made it into the indexes
    pub atoms_indexed: usize,

    /// Malformed records skipped
    pub skipped_malformed: usize,

    /// Records of a concept type that is not indexed
    pub skipped_type: usize,

    /// Records whose whole term is a stop phrase
    pub skipped_stopword: usize,

    /// Lower-level terms dropped as duplicates of a preferred term
    pub pruned_duplicates: usize,

    /// Variant keys added on top of the terms' own keys
    pub variant_keys: usize,
}

impl BuildStats {
    /// Records skipped for any reason
    pub fn total_skipped(&self) -> usize {
        self.skipped_malformed + self.skipped_type + self.skipped_stopword + self.pruned_duplicates
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} atoms indexed, {} variant keys, {} skipped ({} malformed, {} type, {} stopword, {} duplicate)",
            self.records_read,
            self.atoms_indexed,
            self.variant_keys,
            self.total_skipped(),
            self.skipped_malformed,
            self.skipped_type,
            self.skipped_stopword,
            self.pruned_duplicates,
        )
    }
}

/// Exact and stemmed term indexes plus the atom table
///
/// Built once by [`crate::DictionaryBuilder`] and read-only afterwards.
/// Share it across workers through an `Arc`.
pub struct TermDictionary {
    pub(crate) exact: TermIndex,
    pub(crate) stemmed: TermIndex,
    pub(crate) atoms: HashMap<String, Atom>,
    pub(crate) preferred_by_code: HashMap<String, String>,
    pub(crate) valid_types: Vec<ConceptType>,
    pub(crate) stopwords: StopwordList,
    pub(crate) stemmer: Arc<dyn Stemmer + Send + Sync>,
    pub(crate) stats: BuildStats,
}

impl std::fmt::Debug for TermDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermDictionary")
            .field("atoms", &self.atoms.len())
            .field("exact_keys", &self.exact.key_count())
            .field("stemmed_keys", &self.stemmed.key_count())
            .field("max_token_match_length", &self.max_token_match_length())
            .finish()
    }
}

impl TermDictionary {
    /// Index for a match class
    pub fn index(&self, class: MatchClass) -> &TermIndex {
        match class {
            MatchClass::Exact => &self.exact,
            MatchClass::Algorithmic => &self.stemmed,
        }
    }

    /// Atom ids for a key in one concept type
    pub fn lookup(&self, class: MatchClass, tty: ConceptType, key: &str) -> Option<&[String]> {
        self.index(class).lookup(tty, key)
    }

    /// Whether any concept type holds the key
    pub fn contains_key(&self, class: MatchClass, key: &str) -> bool {
        self.index(class).contains_key(key)
    }

    /// Longest key across both indexes, in tokens
    pub fn max_token_match_length(&self) -> usize {
        self.exact.max_len().max(self.stemmed.max_len())
    }

    /// Atom by id
    pub fn atom(&self, aui: &str) -> Option<&Atom> {
        self.atoms.get(aui)
    }

    /// Number of indexed atoms
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Preferred-term atom a lower-level atom rolls up to.
    ///
    /// Preferred terms resolve to themselves; atoms without a PT code in
    /// the dictionary resolve to `None`.
    pub fn preferred_for(&self, atom: &Atom) -> Option<&Atom> {
        if atom.tty == ConceptType::Preferred {
            return self.atoms.get(&atom.aui);
        }
        let code = atom.pt_code.as_deref()?;
        let aui = self.preferred_by_code.get(code)?;
        self.atoms.get(aui)
    }

    /// Concept types that were indexed, in lookup priority order
    pub fn valid_types(&self) -> &[ConceptType] {
        &self.valid_types
    }

    /// Stopword list used for the algorithmic pass
    pub fn stopwords(&self) -> &StopwordList {
        &self.stopwords
    }

    /// Stemmer shared by the stemmed index and match-time text
    pub fn stemmer(&self) -> &(dyn Stemmer + Send + Sync) {
        self.stemmer.as_ref()
    }

    /// Stem each token of a normalized phrase
    pub fn stem_phrase(&self, phrase: &str) -> String {
        stem_phrase(self.stemmer.as_ref(), phrase)
    }

    /// Build counters
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_tracks_length_and_ignores_duplicate_ids() {
        let mut index = TermIndex::new();
        assert!(index.insert(ConceptType::Preferred, "lung cancer", "A1"));
        assert!(!index.insert(ConceptType::Preferred, "lung cancer", "A1"));
        assert!(index.insert(ConceptType::Preferred, "lung cancer", "A2"));
        assert!(!index.insert(ConceptType::Preferred, "   ", "A3"));

        assert_eq!(
            index.get(ConceptType::Preferred, 2, "lung cancer"),
            Some(&["A1".to_string(), "A2".to_string()][..])
        );
        assert_eq!(index.get(ConceptType::Preferred, 1, "lung cancer"), None);
        assert_eq!(index.key_count(), 1);
        assert_eq!(index.max_len(), 2);
    }

    #[test]
    fn test_contains_key_checks_every_type() {
        let mut index = TermIndex::new();
        index.insert(ConceptType::HighLevel, "skin disorders", "A9");
        assert!(index.contains_key("skin disorders"));
        assert!(!index.contains_key("skin"));
        assert_eq!(index.types().collect::<Vec<_>>(), vec![ConceptType::HighLevel]);
    }

    #[test]
    fn test_entry_length_matches_key() {
        let mut index = TermIndex::new();
        index.insert(ConceptType::Preferred, "rash", "A1");
        index.insert(ConceptType::LowerLevel, "increased blood bilirubin", "A2");
        for (_, len, key, _) in index.iter() {
            assert_eq!(len, token_count(key));
        }
    }

    #[test]
    fn test_stats_summary() {
        let stats = BuildStats {
            records_read: 10,
            atoms_indexed: 7,
            skipped_malformed: 1,
            skipped_type: 2,
            ..Default::default()
        };
        assert_eq!(stats.total_skipped(), 3);
        assert!(stats.summary().starts_with("10 records, 7 atoms indexed"));
    }
}
