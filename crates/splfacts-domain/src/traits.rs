//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the matching core and the
//! infrastructure around it. Implementations live in other crates.

use serde::{Deserialize, Serialize};

use crate::{ConceptRecord, SourceDocument};

/// Splits text into sentences
pub trait Segmenter {
    /// Sentence strings in document order; blank sentences are omitted
    fn sentences(&self, text: &str) -> Vec<String>;
}

/// Splits a sentence into tokens
pub trait Tokenizer {
    /// Tokens in order
    fn tokens(&self, text: &str) -> Vec<String>;
}

/// Reduces a single token to its stem
pub trait Stemmer {
    /// Stem one lowercase token
    fn stem(&self, token: &str) -> String;
}

/// Decides whether a token is a stopword (non-exact pass only)
pub trait StopwordPredicate {
    /// Whether the token is a stopword
    fn is_stopword(&self, token: &str) -> bool;
}

/// Supplies raw concept records
///
/// Implemented by vocabulary readers (e.g. `splfacts-dictionary::source`)
pub trait VocabularySource {
    /// Error type for an unreadable source
    type Error;

    /// Read every record.
    ///
    /// The outer error means the source itself could not be read. Inner
    /// errors describe single malformed records, which callers skip.
    fn records(&mut self) -> Result<Vec<Result<ConceptRecord, String>>, Self::Error>;
}

/// Documents sharing one product grouping key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentGroup {
    /// Product grouping key
    pub guid: String,

    /// Source-document ids in the group
    pub document_ids: Vec<String>,
}

/// Supplies source documents grouped by product
///
/// Implemented by document readers (e.g. `splfacts-worker::source`)
pub trait DocumentSource {
    /// Error type for listing or reading documents
    type Error;

    /// Discover document groups
    fn groups(&self) -> Result<Vec<DocumentGroup>, Self::Error>;

    /// Read one document
    fn read(&self, document_id: &str) -> Result<SourceDocument, Self::Error>;
}
