//! Configuration for dictionary construction

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use splfacts_domain::ConceptType;

use crate::error::{DictionaryError, Result};

/// Configuration for the dictionary builder
///
/// # Examples
///
/// ```
/// use splfacts_dictionary::DictionaryConfig;
/// use splfacts_domain::ConceptType;
///
/// let config = DictionaryConfig::default();
/// assert!(config.valid_types.contains(&ConceptType::Preferred));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Concept types that are indexed; every other record is ignored
    /// Default: PT, LLT, HT, HG, OS
    #[serde(default = "default_valid_types")]
    pub valid_types: Vec<ConceptType>,

    /// Direction keywords that make a term reversible
    /// ("alt increased" is also indexed as "increased alt")
    #[serde(default = "default_reversible_keywords")]
    pub reversible_keywords: Vec<String>,

    /// Qualifiers that may trail a term together with a relation word
    /// ("kaposi s sarcoma aids related")
    #[serde(default = "default_qualifier_tokens")]
    pub qualifier_tokens: Vec<String>,

    /// Prefixes of the relation word that follows a trailing qualifier
    #[serde(default = "default_qualifier_tails")]
    pub qualifier_tails: Vec<String>,

    /// Stop phrases; a term made of exactly one of these is never indexed
    #[serde(default = "default_stopword_phrases")]
    pub stopword_phrases: Vec<String>,

    /// Treat every single letter a-z as a stopword
    /// Default: true
    #[serde(default = "default_true")]
    pub include_single_letter_stopwords: bool,

    /// Drop an LLT that repeats a PT's code and normalized term
    /// Default: true
    #[serde(default = "default_true")]
    pub prune_duplicate_lower_level: bool,

    /// Terms longer than this many tokens are skipped as malformed
    /// Default: 32
    #[serde(default = "default_max_term_tokens")]
    pub max_term_tokens: usize,

    /// Organ noun to adjective table used for "X of the Y" rotation
    #[serde(default = "default_organ_adjectives")]
    pub organ_adjectives: BTreeMap<String, String>,
}

fn default_valid_types() -> Vec<ConceptType> {
    vec![
        ConceptType::Preferred,
        ConceptType::LowerLevel,
        ConceptType::HighLevel,
        ConceptType::HighLevelGroup,
        ConceptType::OrganSystem,
    ]
}

fn default_reversible_keywords() -> Vec<String> {
    to_strings(&["increased", "increase", "decreased", "decrease", "abnormal"])
}

fn default_qualifier_tokens() -> Vec<String> {
    to_strings(&["aids", "hiv", "radiation", "drug"])
}

fn default_qualifier_tails() -> Vec<String> {
    to_strings(&["relat", "induc"])
}

fn default_organ_adjectives() -> BTreeMap<String, String> {
    [
        ("ovary", "ovarian"),
        ("kidney", "renal"),
        ("liver", "hepatic"),
        ("stomach", "gastric"),
        ("brain", "cerebral"),
        ("blood", "hematologic"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_stopword_phrases() -> Vec<String> {
    to_strings(&[
        "the", "of", "and", "or", "in", "with", "an", "to", "for", "is", "are", "was",
        "were", "be", "been", "by", "on", "at", "as", "that", "this", "these", "those",
        "may", "can", "other", "including", "such as", "patients", "patient",
    ])
}

fn default_true() -> bool {
    true
}

fn default_max_term_tokens() -> usize {
    32
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            valid_types: default_valid_types(),
            reversible_keywords: default_reversible_keywords(),
            qualifier_tokens: default_qualifier_tokens(),
            qualifier_tails: default_qualifier_tails(),
            organ_adjectives: default_organ_adjectives(),
            stopword_phrases: default_stopword_phrases(),
            include_single_letter_stopwords: true,
            prune_duplicate_lower_level: true,
            max_term_tokens: default_max_term_tokens(),
        }
    }
}

impl DictionaryConfig {
    /// Literal-only configuration: no variant keys and no pruning
    ///
    /// Useful when the vocabulary already carries every surface form.
    pub fn literal() -> Self {
        Self {
            reversible_keywords: Vec::new(),
            qualifier_tokens: Vec::new(),
            qualifier_tails: Vec::new(),
            organ_adjectives: BTreeMap::new(),
            prune_duplicate_lower_level: false,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.valid_types.is_empty() {
            return Err("valid_types must name at least one concept type".to_string());
        }
        if self.max_term_tokens == 0 {
            return Err("max_term_tokens must be greater than 0".to_string());
        }
        if self.qualifier_tokens.is_empty() != self.qualifier_tails.is_empty() {
            return Err("qualifier_tokens and qualifier_tails must be set together".to_string());
        }
        if let Some((noun, _)) = self
            .organ_adjectives
            .iter()
            .find(|(noun, adj)| noun.trim().is_empty() || adj.trim().is_empty())
        {
            return Err(format!("organ_adjectives has a blank entry near '{}'", noun));
        }
        Ok(())
    }

    /// Whether a concept type is indexed
    pub fn is_valid_type(&self, tty: ConceptType) -> bool {
        self.valid_types.contains(&tty)
    }

    /// Load from TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> std::result::Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }

    /// Load and validate from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(DictionaryError::Config)?;
        config.validate().map_err(DictionaryError::Config)?;
        Ok(config)
    }
}
