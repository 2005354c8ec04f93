//! Merge rejections

use splfacts_domain::SourceType;
use thiserror::Error;

/// Why two product aggregates were not merged.
///
/// A rejected merge leaves the receiving aggregate unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeRejection {
    /// The aggregates come from different source types
    #[error("Source type mismatch: {ours:?} vs {theirs:?}")]
    SourceTypeMismatch {
        /// Receiving aggregate's source type
        ours: SourceType,
        /// Incoming aggregate's source type
        theirs: SourceType,
    },

    /// Only one side is a co-pack and the ingredients do not confirm it
    #[error("Copack mismatch")]
    CopackMismatch,

    /// Both sides list ingredients and the lists differ
    #[error("Ingredient mismatch")]
    IngredientMismatch,

    /// Neither the product codes nor an application number agree
    #[error("No product or NDA agreement")]
    NoAgreement,

    /// Only the application number agrees and the ingredients differ
    #[error("NDA-only agreement with differing ingredients")]
    NdaOnlyIngredientMismatch,
}

/// Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeRejection>;
