//! Safety label change terms and their application to products

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use splfacts_domain::{LabelDate, MatchClass, SafetyLabelChange, SectionKind};
use tracing::{debug, info};

use crate::bucket::{LabelBuckets, MatchBucket};
use crate::product::ProductAggregate;

/// Buckets a label change can contribute to
pub(crate) const CHANGE_BUCKETS: [(SectionKind, MatchClass); 4] = [
    (SectionKind::AdverseEvent, MatchClass::Exact),
    (SectionKind::AdverseEvent, MatchClass::Algorithmic),
    (SectionKind::BoxedWarning, MatchClass::Exact),
    (SectionKind::BoxedWarning, MatchClass::Algorithmic),
];

/// Terms matched in one safety label change.
///
/// Only the warning and boxed-warning buckets are used; indication buckets
/// stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelChange {
    /// Application number the change applies to
    pub application_number: u32,
    /// Source id the terms are attributed to while matching
    pub source: String,
    /// Date the terms are observed on
    pub date: LabelDate,
    /// Matched terms
    pub labels: LabelBuckets,
}

impl LabelChange {
    /// Empty change for an application number
    pub fn new(application_number: u32, date: LabelDate) -> Self {
        Self {
            application_number,
            source: format!("NDA0{application_number}"),
            date,
            labels: LabelBuckets::default(),
        }
    }

    /// Empty change for a published record; `None` when the record has no
    /// usable date or application number
    pub fn from_record(record: &SafetyLabelChange) -> Option<Self> {
        if record.application_number == 0 {
            return None;
        }
        let date = record.observed_on()?;
        Some(Self {
            source: record.source_id(),
            ..Self::new(record.application_number, date)
        })
    }

    /// Bucket for a section and match class
    pub fn bucket(&self, section: SectionKind, class: MatchClass) -> &MatchBucket {
        self.labels.get(section, class)
    }

    /// Whether any warning or boxed-warning term was matched
    pub fn has_terms(&self) -> bool {
        CHANGE_BUCKETS
            .iter()
            .any(|(section, class)| !self.bucket(*section, *class).is_empty())
    }

    /// Drop algorithmic atoms the exact pass already found.
    ///
    /// Returns the number of atoms removed.
    pub fn resolve_labeled_events(&mut self) -> usize {
        let mut removed = 0;
        for section in [SectionKind::AdverseEvent, SectionKind::BoxedWarning] {
            let exact: BTreeSet<String> = self
                .labels
                .get(section, MatchClass::Exact)
                .auis()
                .map(str::to_string)
                .collect();
            removed += self
                .labels
                .get_mut(section, MatchClass::Algorithmic)
                .remove_auis(&exact);
        }
        removed
    }
}

/// Apply label changes to every product carrying their application number.
///
/// Changes without terms are skipped. Returns the number of
/// (product, change) applications.
pub fn apply_label_changes(products: &mut [ProductAggregate], changes: &[LabelChange]) -> usize {
    let mut by_nda: BTreeMap<u32, Vec<&LabelChange>> = BTreeMap::new();
    for change in changes {
        if change.application_number > 0 && change.has_terms() {
            by_nda.entry(change.application_number).or_default().push(change);
        }
    }
    if by_nda.is_empty() {
        return 0;
    }

    let mut applied = 0;
    for product in products.iter_mut() {
        for nda in product.nda_ids() {
            let Some(group) = by_nda.get(&nda) else {
                continue;
            };
            for change in group {
                let added = product.update_from_srlc(change);
                debug!(guid = %product.guid, nda, added, "Label change applied");
                applied += 1;
            }
        }
    }
    info!(changes = changes.len(), applied, "Safety label changes applied");
    applied
}
