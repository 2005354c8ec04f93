//! Error types for match engine construction

use thiserror::Error;

/// Errors raised while building a match engine.
///
/// Matching itself never fails; every error here surfaces before the first
/// sentence is looked at.
#[derive(Error, Debug)]
pub enum MatchError {
    /// A lexicon regex did not compile
    #[error("Invalid pattern '{0}': {1}")]
    InvalidPattern(String, String),

    /// Invalid lexicon configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lexicon or antonym file error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for matcher construction
pub type Result<T> = std::result::Result<T, MatchError>;

/// Compile a lexicon regex, keeping the pattern in the error
pub(crate) fn compile(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(pattern).map_err(|e| MatchError::InvalidPattern(pattern.to_string(), e.to_string()))
}
