//! Dictionary construction from a vocabulary source

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use splfacts_domain::traits::{Stemmer, VocabularySource};
use splfacts_domain::{Atom, ConceptRecord, ConceptType};
use tracing::{debug, info, warn};

use crate::config::DictionaryConfig;
use crate::dictionary::{BuildStats, TermDictionary, TermIndex};
use crate::error::{DictionaryError, Result};
use crate::normalize::{normalize_term, token_count, TextPatterns};
use crate::stemmer::{stem_phrase, SnowballStemmer};
use crate::stopwords::StopwordList;
use crate::variants::variants;

/// Builds a [`TermDictionary`] from concept records
///
/// # Examples
///
/// ```
/// use splfacts_dictionary::{DictionaryBuilder, DictionaryConfig, VecVocabulary};
/// use splfacts_domain::{ConceptRecord, ConceptType, MatchClass};
///
/// let record = ConceptRecord {
///     cui: "C0018681".to_string(),
///     aui: "A0001".to_string(),
///     code: "10019211".to_string(),
///     pt_code: None,
///     tty: "PT".to_string(),
///     term: "Headache".to_string(),
///     sab: "MDR".to_string(),
///     is_pref: true,
///     ptr: None,
///     parents: vec![],
///     children: vec![],
/// };
///
/// let dictionary = DictionaryBuilder::new(DictionaryConfig::default())
///     .build(&mut VecVocabulary::new(vec![record]))
///     .unwrap();
///
/// assert!(dictionary.lookup(MatchClass::Exact, ConceptType::Preferred, "headache").is_some());
/// ```
pub struct DictionaryBuilder {
    config: DictionaryConfig,
    stopwords: Option<StopwordList>,
    stemmer: Arc<dyn Stemmer + Send + Sync>,
}

impl DictionaryBuilder {
    /// Create a builder with the Snowball English stemmer and the
    /// configured stopword phrases
    pub fn new(config: DictionaryConfig) -> Self {
        Self {
            config,
            stopwords: None,
            stemmer: Arc::new(SnowballStemmer::english()),
        }
    }

    /// Use an explicit stopword list instead of the configured phrases
    pub fn with_stopwords(mut self, stopwords: StopwordList) -> Self {
        self.stopwords = Some(stopwords);
        self
    }

    /// Use a different stemmer
    pub fn with_stemmer(mut self, stemmer: Arc<dyn Stemmer + Send + Sync>) -> Self {
        self.stemmer = stemmer;
        self
    }

    /// Read every record from the source and build the dictionary.
    ///
    /// Fails when the configuration is invalid, the source cannot be read,
    /// or no record survives validation. Single malformed records are
    /// logged and skipped.
    pub fn build<S>(&self, source: &mut S) -> Result<TermDictionary>
    where
        S: VocabularySource,
        S::Error: std::fmt::Display,
    {
        self.config.validate().map_err(DictionaryError::Config)?;
        TextPatterns::shared().map_err(|e| DictionaryError::Pattern(e.to_string()))?;

        let records = source
            .records()
            .map_err(|e| DictionaryError::SourceUnreadable(e.to_string()))?;

        self.build_from_records(records)
    }

    /// Build from records already read
    pub fn build_from_records(
        &self,
        records: Vec<std::result::Result<ConceptRecord, String>>,
    ) -> Result<TermDictionary> {
        let stopwords = self.stopwords.clone().unwrap_or_else(|| {
            StopwordList::new(
                &self.config.stopword_phrases,
                self.config.include_single_letter_stopwords,
            )
        });

        let mut stats = BuildStats {
            records_read: records.len(),
            ..Default::default()
        };

        let accepted = self.accept(records, &stopwords, &mut stats);
        let accepted = if self.config.prune_duplicate_lower_level {
            prune_duplicate_lower_level(accepted, &mut stats)
        } else {
            accepted
        };

        if accepted.is_empty() {
            let skipped = stats.total_skipped();
            warn!("Vocabulary produced no usable atoms ({} skipped)", skipped);
            return Err(DictionaryError::EmptyVocabulary(skipped));
        }

        let mut exact = TermIndex::new();
        let mut stemmed = TermIndex::new();
        let mut atoms: HashMap<String, Atom> = HashMap::with_capacity(accepted.len());
        let mut preferred_by_code: HashMap<String, String> = HashMap::new();

        for (atom, key) in accepted {
            let mut keys = vec![key];
            let extra = variants(&keys[0], &self.config);
            stats.variant_keys += extra.len();
            keys.extend(extra);

            for key in &keys {
                exact.insert(atom.tty, key, &atom.aui);
                stemmed.insert(atom.tty, &stem_phrase(self.stemmer.as_ref(), key), &atom.aui);
            }

            if atom.tty == ConceptType::Preferred && !atom.code.is_empty() {
                preferred_by_code
                    .entry(atom.code.clone())
                    .or_insert_with(|| atom.aui.clone());
            }
            atoms.insert(atom.aui.clone(), atom);
        }
        stats.atoms_indexed = atoms.len();

        let mut valid_types = self.config.valid_types.clone();
        valid_types.sort_by_key(ConceptType::priority);
        valid_types.dedup();

        let dictionary = TermDictionary {
            exact,
            stemmed,
            atoms,
            preferred_by_code,
            valid_types,
            stopwords,
            stemmer: Arc::clone(&self.stemmer),
            stats,
        };

        info!(
            "Term dictionary built: {} (max {} tokens)",
            dictionary.stats().summary(),
            dictionary.max_token_match_length()
        );
        Ok(dictionary)
    }

    /// Validate records and pair each surviving atom with its normalized key
    fn accept(
        &self,
        records: Vec<std::result::Result<ConceptRecord, String>>,
        stopwords: &StopwordList,
        stats: &mut BuildStats,
    ) -> Vec<(Atom, String)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted = Vec::with_capacity(records.len());

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(reason) => {
                    warn!("Skipping malformed vocabulary record: {}", reason);
                    stats.skipped_malformed += 1;
                    continue;
                }
            };

            let atom = match Atom::try_from(record) {
                Ok(atom) => atom,
                Err(reason) => {
                    warn!("Skipping malformed vocabulary record: {}", reason);
                    stats.skipped_malformed += 1;
                    continue;
                }
            };

            if !self.config.is_valid_type(atom.tty) {
                stats.skipped_type += 1;
                continue;
            }

            if stopwords.is_stop_phrase(&atom.term) {
                debug!("Skipping stopword term '{}' ({})", atom.term, atom.aui);
                stats.skipped_stopword += 1;
                continue;
            }

            let key = normalize_term(&atom.term);
            let len = token_count(&key);
            if len == 0 || len > self.config.max_term_tokens {
                warn!(
                    "Skipping record {}: term '{}' normalizes to {} tokens",
                    atom.aui, atom.term, len
                );
                stats.skipped_malformed += 1;
                continue;
            }

            if !seen.insert(atom.aui.clone()) {
                warn!("Skipping duplicate atom id {}", atom.aui);
                stats.skipped_malformed += 1;
                continue;
            }

            accepted.push((atom, key));
        }

        accepted
    }
}

/// Drop lower-level atoms whose code and key repeat a preferred term
fn prune_duplicate_lower_level(
    accepted: Vec<(Atom, String)>,
    stats: &mut BuildStats,
) -> Vec<(Atom, String)> {
    let preferred: HashSet<(String, String)> = accepted
        .iter()
        .filter(|(atom, _)| atom.tty == ConceptType::Preferred)
        .map(|(atom, key)| (atom.code.clone(), key.clone()))
        .collect();

    let before = accepted.len();
    let kept: Vec<(Atom, String)> = accepted
        .into_iter()
        .filter(|(atom, key)| {
            atom.tty != ConceptType::LowerLevel
                || !preferred.contains(&(atom.code.clone(), key.clone()))
        })
        .collect();

    stats.pruned_duplicates += before - kept.len();
    kept
}

/// Build a dictionary with the default stemmer and stopwords
pub fn build_dictionary<S>(source: &mut S, config: DictionaryConfig) -> Result<TermDictionary>
where
    S: VocabularySource,
    S::Error: std::fmt::Display,
{
    DictionaryBuilder::new(config).build(source)
}
