//! splfacts Dictionary
//!
//! Builds the read-only term dictionary the match engine looks terms up in.
//!
//! # Overview
//!
//! A vocabulary of concept records (preferred terms, lower-level synonyms,
//! grouping terms) is indexed twice:
//! - **Exact index**: surface-normalized keys ("blood bilirubin increased")
//! - **Stemmed index**: the same keys with every token stemmed
//!   ("blood bilirubin increas")
//!
//! Both indexes map concept type → token length → key → atom ids, so the
//! matcher can walk n-grams from the longest length down.
//!
//! # Architecture
//!
//! ```text
//! VocabularySource → DictionaryBuilder → TermDictionary (Arc, read-only)
//!                         │
//!                         ├─ normalize (punctuation folding, key alphabet)
//!                         ├─ variants  (keyword reversal, rotations)
//!                         └─ stemmer   (Snowball English)
//! ```
//!
//! # Key Features
//!
//! - **Variant keys**: "alt increased" is also found as "increased alt"
//! - **Duplicate pruning**: LLTs that repeat their PT are dropped
//! - **Lenient input**: malformed records are logged and skipped
//! - **Loud failure**: an unreadable or empty vocabulary is an error
//!
//! # Example
//!
//! ```no_run
//! use splfacts_dictionary::{build_dictionary, DictionaryConfig, JsonLinesVocabulary};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = JsonLinesVocabulary::new("vocabulary.jsonl");
//! let dictionary = build_dictionary(&mut source, DictionaryConfig::default())?;
//! println!("{}", dictionary.stats().summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod builder;
mod config;
mod dictionary;
mod error;
pub mod normalize;
mod source;
mod stemmer;
mod stopwords;
pub mod variants;

#[cfg(test)]
mod tests;

pub use builder::{build_dictionary, DictionaryBuilder};
pub use config::DictionaryConfig;
pub use dictionary::{BuildStats, TermDictionary, TermIndex};
pub use error::{DictionaryError, Result};
pub use normalize::{clean_text, fold_sentence, normalize_punct, normalize_term, KeyTokenizer};
pub use source::{parse_json_lines, JsonLinesVocabulary, VecVocabulary};
pub use stemmer::{stem_phrase, SnowballStemmer};
pub use stopwords::StopwordList;
