//! Metrics collection for extraction runs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use splfacts_domain::{MatchClass, SectionKind};

/// Metrics collected during an extraction run
///
/// Each pool task fills its own copy; copies are combined with
/// [`WorkerMetrics::absorb`] when the task finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerMetrics {
    /// Document groups fully processed
    pub groups_processed: usize,

    /// Documents matched and merged
    pub documents_processed: usize,

    /// Documents that could not be read after all retries
    pub documents_failed: usize,

    /// Read attempts repeated after a failure
    pub read_retries: usize,

    /// Document aggregates refused by a merge guard
    pub merges_rejected: usize,

    /// Exact matches dropped from the algorithmic pass input
    pub exact_terms_removed: usize,

    /// Atoms dropped by the indication exclusions
    pub indications_excluded: usize,

    /// Atoms removed by labeled-event resolution
    pub labeled_events_resolved: usize,

    /// Safety label changes matched
    pub label_changes_matched: usize,

    /// (product, label change) applications
    pub label_changes_applied: usize,

    /// Atoms added per section and match class
    #[serde(skip)]
    pub terms: HashMap<(SectionKind, MatchClass), usize>,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl WorkerMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished group
    pub fn record_group(&mut self) {
        self.groups_processed += 1;
    }

    /// Record a processed document
    pub fn record_document(&mut self) {
        self.documents_processed += 1;
    }

    /// Record a document given up on
    pub fn record_failure(&mut self) {
        self.documents_failed += 1;
    }

    /// Record a retried read
    pub fn record_retry(&mut self) {
        self.read_retries += 1;
    }

    /// Record a refused merge
    pub fn record_rejection(&mut self) {
        self.merges_rejected += 1;
    }

    /// Record atoms added to a bucket
    pub fn record_terms(&mut self, section: SectionKind, class: MatchClass, count: usize) {
        *self.terms.entry((section, class)).or_insert(0) += count;
    }

    /// Atoms added to one bucket
    pub fn terms_in(&self, section: SectionKind, class: MatchClass) -> usize {
        self.terms.get(&(section, class)).copied().unwrap_or(0)
    }

    /// Atoms added across all buckets
    pub fn total_terms(&self) -> usize {
        self.terms.values().sum()
    }

    /// Add another task's counts into these
    pub fn absorb(&mut self, other: &WorkerMetrics) {
        self.groups_processed += other.groups_processed;
        self.documents_processed += other.documents_processed;
        self.documents_failed += other.documents_failed;
        self.read_retries += other.read_retries;
        self.merges_rejected += other.merges_rejected;
        self.exact_terms_removed += other.exact_terms_removed;
        self.indications_excluded += other.indications_excluded;
        self.labeled_events_resolved += other.labeled_events_resolved;
        self.label_changes_matched += other.label_changes_matched;
        self.label_changes_applied += other.label_changes_applied;
        for (key, count) in &other.terms {
            *self.terms.entry(*key).or_insert(0) += count;
        }
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Extraction Metrics Summary".to_string(),
            "==========================".to_string(),
            format!("Groups: {}", self.groups_processed),
            format!(
                "Documents: {} processed, {} failed, {} retried reads",
                self.documents_processed, self.documents_failed, self.read_retries
            ),
            format!("Rejected merges: {}", self.merges_rejected),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        if !self.terms.is_empty() {
            lines.push("Terms by section:".to_string());
            for section in SectionKind::ALL {
                lines.push(format!(
                    "  {}: {} exact, {} algorithmic",
                    section,
                    self.terms_in(section, MatchClass::Exact),
                    self.terms_in(section, MatchClass::Algorithmic)
                ));
            }
            lines.push(format!("  Total: {}", self.total_terms()));
            lines.push(String::new());
        }

        lines.push(format!("Exact terms removed before stemming: {}", self.exact_terms_removed));
        lines.push(format!("Indications excluded: {}", self.indications_excluded));
        lines.push(format!("Labeled events resolved: {}", self.labeled_events_resolved));
        if self.label_changes_matched > 0 {
            lines.push(format!(
                "Label changes: {} matched, {} applied",
                self.label_changes_matched, self.label_changes_applied
            ));
        }

        lines.join("\n")
    }
}
