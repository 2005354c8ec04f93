//! splfacts Domain Layer
//!
//! Core vocabulary and document model shared by every other splfacts crate.
//! Nothing in here performs I/O; file-backed implementations of the
//! collaborator traits live in the crates that need them.
//!
//! ## Key Concepts
//!
//! - **Atom**: one term string bound to a concept (CUI) with its own id (AUI)
//! - **Concept type**: closed set of vocabulary roles (PT, LLT, HT, HG, OS)
//! - **Section**: the label section a piece of text came from
//! - **Match class**: exact dictionary hit vs. algorithmic (stemmed) hit
//! - **Source document**: one label version with its section texts and
//!   product grouping metadata
//! - **Safety label change**: warning text published for an application
//!   number outside the label archive
//!
//! ## Architecture
//!
//! - Plain data plus the traits for external collaborators
//!   (segmenter, tokenizer, stemmer, stopword predicate, vocabulary and
//!   document sources)
//! - Only `serde` and `chrono` as dependencies

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atom;
pub mod concept_type;
pub mod date;
pub mod document;
pub mod label_change;
pub mod section;
pub mod traits;

// Re-exports for convenience
pub use atom::{Atom, ConceptRecord, UNASSIGNED_ID};
pub use concept_type::ConceptType;
pub use date::LabelDate;
pub use document::{CodeRef, ProductCodes, SectionText, SourceDocument, SourceType};
pub use label_change::SafetyLabelChange;
pub use section::{MatchClass, SectionContext, SectionKind};
pub use traits::DocumentGroup;
