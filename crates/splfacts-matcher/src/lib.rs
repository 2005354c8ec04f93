//! splfacts Matcher
//!
//! Finds dictionary terms in product-label sections while keeping out the
//! mentions that are not claims: negated findings, product names, patient
//! history, normal lab results.
//!
//! # Overview
//!
//! Text is segmented into sentences. Each sentence is folded to ASCII
//! lowercase and gated as a whole; a sentence that passes has its n-grams
//! looked up, longest first. The candidates then go through an ordered
//! stage pipeline before their atom ids are merged per key.
//!
//! # Architecture
//!
//! ```text
//! text → RuleSegmenter → fold → SentenceGate ─┬─ rejected (no lookup)
//!                                             │
//!                        ┌────────────────────┘
//!                        ▼
//!          n-gram lookup (exact or stemmed index)
//!                        │
//!                        ▼
//!          occurrence stages (per span)
//!                        │
//!                        ▼
//!          resolution stages (across candidates)
//!                        │
//!                        ▼
//!          key → [atom id]
//! ```
//!
//! # Key Features
//!
//! - **Section-aware**: indication, adverse-event and boxed-warning rules differ
//! - **Occurrence-level**: a candidate survives if any occurrence survives
//! - **Configurable**: every phrase, pattern and window lives in [`MatchLexicon`]
//! - **Pure**: matching never mutates the engine or the dictionary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use splfacts_dictionary::{build_dictionary, DictionaryConfig, JsonLinesVocabulary};
//! use splfacts_domain::SectionContext;
//! use splfacts_matcher::{MatchEngine, MatchLexicon};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = JsonLinesVocabulary::new("vocabulary.jsonl");
//! let dictionary = Arc::new(build_dictionary(&mut source, DictionaryConfig::default())?);
//! let engine = MatchEngine::new(dictionary, MatchLexicon::default())?;
//!
//! let found = engine.match_text(
//!     &SectionContext::adverse_event(),
//!     "Headache and nausea were the most common reactions.",
//!     true,
//! );
//! for (term, ids) in &found {
//!     println!("{term}: {ids:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod antonyms;
mod candidate;
mod engine;
mod error;
mod gate;
mod lexicon;
mod segment;
pub mod stages;

#[cfg(test)]
mod tests;

pub use antonyms::AntonymLexicon;
pub use candidate::{locate_spans, Candidate, Span, TypeHit};
pub use engine::{MatchEngine, TermMatches};
pub use error::{MatchError, Result};
pub use gate::{GateOutcome, SentenceGate};
pub use lexicon::{Composite, LabTrigger, MatchLexicon, RewriteRule, TermPair, TERM_PLACEHOLDER};
pub use segment::RuleSegmenter;
