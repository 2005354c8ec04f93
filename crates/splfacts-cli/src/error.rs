//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dictionary could not be built
    #[error("Dictionary error: {0}")]
    Dictionary(#[from] splfacts_dictionary::DictionaryError),

    /// Match engine could not be compiled
    #[error("Matcher error: {0}")]
    Match(#[from] splfacts_matcher::MatchError),

    /// Extraction run failed
    #[error("Worker error: {0}")]
    Worker(#[from] splfacts_worker::WorkerError),

    /// Id counters could not be set up
    #[error("Registry error: {0}")]
    Registry(#[from] splfacts_registry::RegistryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
