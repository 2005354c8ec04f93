//! Error types for dictionary construction

use thiserror::Error;

/// Errors that can occur while building a term dictionary
#[derive(Error, Debug)]
pub enum DictionaryError {
    /// The vocabulary source could not be read at all
    #[error("Vocabulary source unreadable: {0}")]
    SourceUnreadable(String),

    /// Every record was skipped
    #[error("Vocabulary yielded no usable records ({0} skipped)")]
    EmptyVocabulary(usize),

    /// Invalid dictionary configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A normalization pattern failed to compile
    #[error("Normalization pattern error: {0}")]
    Pattern(String),

    /// Stopword or vocabulary file error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for dictionary operations
pub type Result<T> = std::result::Result<T, DictionaryError>;
