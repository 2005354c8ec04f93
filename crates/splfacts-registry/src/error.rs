//! Registry errors

use thiserror::Error;

/// Registry error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Counters were already bootstrapped in this process
    #[error("Id counters already bootstrapped")]
    AlreadyBootstrapped,
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
