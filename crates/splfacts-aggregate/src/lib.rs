//! splfacts Aggregate
//!
//! Accumulates label facts per product across documents and over time, and
//! groups the per-label aggregates that describe one product.
//!
//! # Overview
//!
//! Every product carries six [`MatchBucket`]s: exact and algorithmic matches
//! for indications, adverse events and boxed warnings. A bucket keeps, per
//! atom, the earliest date the atom was observed and the documents that
//! reported it. Merging two aggregates unions everything and keeps the
//! earliest dates, so merges can happen in any order and any number of times.
//!
//! # Architecture
//!
//! ```text
//! document ─► ProductAggregate::from_document ─► buckets filled by extraction
//!                                                      │
//!                   merge_product_group (guards) ◄─────┘
//!                               │
//!                               ▼
//!          ProductMerger::merge_all (ordered grouping passes)
//!                               │
//!                               ▼
//!                 stamped, pruned, GUID-unique products
//!                               │
//!                               ▼
//!          apply_label_changes (safety label changes by NDA)
//! ```
//!
//! # Merge Guards
//!
//! | Guard | Rejection |
//! |-------|-----------|
//! | source types differ | [`MergeRejection::SourceTypeMismatch`] |
//! | co-pack on one side only, ingredients not identical | [`MergeRejection::CopackMismatch`] |
//! | both list ingredients, lists differ | [`MergeRejection::IngredientMismatch`] |
//! | neither product codes nor NDA agree | [`MergeRejection::NoAgreement`] |
//! | only the NDA agrees, ingredients differ | [`MergeRejection::NdaOnlyIngredientMismatch`] |
//!
//! Product codes agree when the concept sets are equal or either one
//! contains the other. Versions of one label (same non-blank GUID) skip the
//! guards entirely.
//!
//! # Example
//!
//! ```
//! use splfacts_aggregate::ProductAggregate;
//! use splfacts_domain::{Atom, ConceptType, MatchClass, SectionKind, SourceType};
//!
//! let mut product = ProductAggregate::new("guid-1", SourceType::Prescription);
//! let mut label = product.copy_template();
//! let rash = Atom::new("C0015230", "A1", "10037844", ConceptType::Preferred, "Rash");
//! label
//!     .labels
//!     .get_mut(SectionKind::AdverseEvent, MatchClass::Exact)
//!     .add_atom("doc-1", &rash, None);
//!
//! product.merge_product_group(&label).unwrap();
//! assert!(product.labels.exact_warnings.contains("A1"));
//! ```

#![warn(missing_docs)]

mod bucket;
mod error;
mod label_change;
mod merger;
mod ndc;
mod product;


pub use bucket::{LabelBuckets, MatchBucket};
pub use error::{MergeRejection, Result};
pub use label_change::{apply_label_changes, LabelChange};
pub use merger::{MergePass, MergeReference, MergeReport, ProductMerger};
pub use ndc::normalize_ndc;
pub use product::ProductAggregate;

/// Merge `incoming` into `aggregate`.
///
/// Leaves `aggregate` unchanged when a guard rejects the merge.
pub fn merge_product_group(aggregate: &mut ProductAggregate, incoming: &ProductAggregate) -> Result<()> {
    aggregate.merge_product_group(incoming)
}
