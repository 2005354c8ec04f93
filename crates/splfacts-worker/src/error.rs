//! Error types for extraction runs

use thiserror::Error;

/// Errors that can occur during an extraction run
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Invalid worker configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document source could not list its groups
    #[error("Document source error: {0}")]
    Source(String),

    /// A pool task panicked or was cancelled
    #[error("Worker error: {0}")]
    Join(String),

    /// Configuration or document file error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;
