//! splfacts Worker
//!
//! Runs the match engine over batches of label documents and merges the
//! results into per-product aggregates.
//!
//! # Overview
//!
//! - [`JsonLinesDocuments`]: bundled [`DocumentSource`](splfacts_domain::traits::DocumentSource)
//!   reading one `SourceDocument` per line
//! - [`LabelExtractor`]: exact pass, exact-term removal, algorithmic pass,
//!   indication exclusions and labeled-event resolution for one document
//! - [`ExtractionPool`]: bounded pool over document groups, followed by the
//!   cross-product merge and id assignment
//! - [`read_label_changes`]: safety label changes, matched after the
//!   cross-product merge and folded into products by application number
//! - [`WorkerMetrics`]: counts per run, combined from every pool task
//!
//! # Architecture
//!
//! ```text
//! DocumentSource ──► reader task ──► mpsc (bounded) ──► pool (Semaphore)
//!                    (retries)                              │ spawn_blocking
//!                                                           ▼
//!                                   LabelExtractor ──► product Mutex per GUID
//!                                                           │
//!                                     ProductMerger ◄───────┘
//!                                           │
//!                                   IdentityRegistry (ids, written rows)
//! ```
//!
//! A document that cannot be read after its retries, or whose aggregate is
//! refused by a merge guard, is logged and contributes nothing. Only a
//! source that cannot list its groups fails the run.
//!
//! # Configuration Presets
//!
//! ```
//! use splfacts_worker::WorkerConfig;
//!
//! // Default: pool of 4, 64 queued groups, 3 read retries
//! let config = WorkerConfig::default();
//!
//! // Throughput: wide pool, deep queue
//! let config = WorkerConfig::throughput();
//!
//! // Conservative: one group at a time, patient retries
//! let config = WorkerConfig::conservative();
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extract;
mod metrics;
mod source;
mod worker;

pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use extract::{remove_exact_terms, LabelExtractor};
pub use metrics::WorkerMetrics;
pub use source::{parse_label_changes, read_label_changes, truncate_chars, JsonLinesDocuments};
pub use worker::{ExtractionPool, LabelRow, RunOutput};
