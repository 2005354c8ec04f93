//! Per-product aggregate

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use splfacts_domain::{
    Atom, LabelDate, ProductCodes, SourceDocument, SourceType, UNASSIGNED_ID,
};
use tracing::trace;

use crate::bucket::{by_cui, AtomKey, LabelBuckets, MatchBucket};
use crate::error::{MergeRejection, Result};
use crate::label_change::{LabelChange, CHANGE_BUCKETS};
use crate::ndc::normalize_ndc;

/// Everything known about one product, accumulated across its labels.
///
/// `Clone` is a deep value copy; nothing is shared between clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAggregate {
    /// Grouping key of the label set this aggregate started from
    pub guid: String,

    /// Allocated product id (`-1` until allocated)
    pub id: i64,

    /// Prescription, OTC or other
    pub source_type: SourceType,

    /// Document files of this GUID, with whether each has been processed
    pub files: BTreeMap<String, bool>,

    /// Every (GUID, file) pair merged into this product, own GUID included
    pub merged_guids: BTreeMap<String, BTreeSet<String>>,

    /// Approval date per GUID
    pub approval_dates: BTreeMap<String, LabelDate>,

    /// Application (NDA) number per GUID
    pub ndas: BTreeMap<String, u32>,

    /// Product, SNOMED, ingredient, RxNorm and ATC references
    pub codes: ProductCodes,

    /// Latest label date seen
    pub label_date: Option<LabelDate>,

    /// Labeler
    pub sponsor: Option<String>,

    /// Cleared when this product has been absorbed by another
    pub save: bool,

    /// Id this product carried in an earlier run
    pub prior_id: Option<i64>,

    /// Safety label changes applied, by application number
    #[serde(default)]
    pub label_changes: BTreeMap<u32, BTreeSet<LabelDate>>,

    /// Matched label terms
    pub labels: LabelBuckets,
}

impl ProductAggregate {
    /// Create an empty aggregate
    pub fn new(guid: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            guid: guid.into(),
            id: UNASSIGNED_ID,
            source_type,
            files: BTreeMap::new(),
            merged_guids: BTreeMap::new(),
            approval_dates: BTreeMap::new(),
            ndas: BTreeMap::new(),
            codes: ProductCodes::default(),
            label_date: None,
            sponsor: None,
            save: true,
            prior_id: None,
            label_changes: BTreeMap::new(),
            labels: LabelBuckets::default(),
        }
    }

    /// Aggregate describing a single document, with no label terms yet
    pub fn from_document(doc: &SourceDocument) -> Self {
        let mut aggregate = Self::new(doc.guid.clone(), doc.resolved_source_type());
        if !doc.file.is_empty() {
            aggregate.files.insert(doc.file.clone(), false);
            aggregate
                .merged_guids
                .entry(doc.guid.clone())
                .or_default()
                .insert(doc.file.clone());
        }
        if let Some(date) = doc.approval_date {
            aggregate.approval_dates.insert(doc.guid.clone(), date);
        }
        if let Some(nda) = doc.nda {
            aggregate.ndas.insert(doc.guid.clone(), nda);
        }
        aggregate.codes = doc.codes.clone();
        aggregate.label_date = doc.label_date;
        aggregate.sponsor = doc.sponsor.clone();
        aggregate
    }

    /// Copy with identity and codes but no id and no label terms
    pub fn copy_template(&self) -> Self {
        Self {
            id: UNASSIGNED_ID,
            label_changes: BTreeMap::new(),
            labels: LabelBuckets::default(),
            ..self.clone()
        }
    }

    /// Mark a document file as processed
    pub fn mark_processed(&mut self, file: &str) {
        if let Some(done) = self.files.get_mut(file) {
            *done = true;
        }
    }

    /// GUIDs represented by this product
    pub fn all_guids(&self) -> BTreeSet<&str> {
        let mut guids: BTreeSet<&str> = self.merged_guids.keys().map(String::as_str).collect();
        if !self.guid.is_empty() {
            guids.insert(self.guid.as_str());
        }
        guids
    }

    /// Whether the product is a branded co-pack
    pub fn is_copack(&self) -> bool {
        self.codes.rxnorm.values().any(|c| c.is_copack())
    }

    /// Active ingredient auis
    pub fn ingredient_auis(&self) -> BTreeSet<&str> {
        self.codes.ingredients.keys().map(String::as_str).collect()
    }

    /// RxNorm ingredient (IN/PIN) auis
    pub fn rxnorm_ingredient_auis(&self) -> BTreeSet<&str> {
        self.codes
            .rxnorm
            .iter()
            .filter(|(_, c)| c.is_ingredient())
            .map(|(aui, _)| aui.as_str())
            .collect()
    }

    /// Distinct product concept ids, sorted
    pub fn product_cuis(&self) -> BTreeSet<&str> {
        self.codes
            .product_cuis
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Sorted product concept ids joined with `|`
    pub fn multi_cui_key(&self) -> String {
        self.product_cuis().into_iter().collect::<Vec<_>>().join("|")
    }

    /// Distinct NDA numbers, ascending
    pub fn nda_ids(&self) -> Vec<u32> {
        self.ndas
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// NDA of the product's own GUID, else the lowest recorded
    pub fn primary_nda(&self) -> Option<u32> {
        self.ndas
            .get(&self.guid)
            .copied()
            .or_else(|| self.nda_ids().first().copied())
    }

    /// Normalized NDC codes, deduplicated
    pub fn normalized_ndc_codes(&self) -> BTreeSet<String> {
        self.codes
            .raw_ndc_codes
            .iter()
            .filter_map(|raw| normalize_ndc(raw))
            .collect()
    }

    /// Same product concept ids, or a single shared SNOMED parent
    pub fn exact_product_match(&self, other: &ProductAggregate) -> bool {
        let (ours, theirs) = (&self.codes.snomed_parent_auis, &other.codes.snomed_parent_auis);
        if ours.len() == 1 && theirs.len() == 1 && ours[0] == theirs[0] {
            return true;
        }
        self.product_cuis() == other.product_cuis()
    }

    /// Every product concept id of `other` is one of ours
    pub fn contains_product_cuis(&self, other: &ProductAggregate) -> bool {
        let theirs = other.product_cuis();
        !theirs.is_empty() && theirs.is_subset(&self.product_cuis())
    }

    /// Both products list an NDA number in common
    pub fn shares_nda(&self, other: &ProductAggregate) -> bool {
        let ours = self.nda_ids();
        other.ndas.values().any(|nda| ours.contains(nda))
    }

    /// Every SNOMED parent of `other` is one of ours
    pub fn has_snomed_parents(&self, other: &ProductAggregate) -> bool {
        let ours: BTreeSet<&String> = self.codes.snomed_parent_auis.iter().collect();
        !other.codes.snomed_parent_auis.is_empty()
            && other.codes.snomed_parent_auis.iter().all(|p| ours.contains(p))
    }

    /// Identical, non-empty RxNorm ingredient sets
    pub fn has_exact_rxnorm_ingredients(&self, other: &ProductAggregate) -> bool {
        let ours = self.rxnorm_ingredient_auis();
        !ours.is_empty() && ours == other.rxnorm_ingredient_auis()
    }

    /// Identical, non-empty ATC class sets
    pub fn has_exact_atc_class(&self, other: &ProductAggregate) -> bool {
        !self.codes.atc.is_empty()
            && self.codes.atc.keys().eq(other.codes.atc.keys())
    }

    /// Both aggregates describe the same label set (same non-blank GUID)
    pub fn same_grouping_key(&self, other: &ProductAggregate) -> bool {
        !self.guid.trim().is_empty() && self.guid == other.guid
    }

    /// Check the merge guards without merging.
    ///
    /// Versions of one label set always agree; the guards only apply
    /// between different GUIDs.
    pub fn check_merge(&self, other: &ProductAggregate) -> Result<()> {
        if self.same_grouping_key(other) {
            return Ok(());
        }
        if self.source_type != other.source_type {
            return Err(MergeRejection::SourceTypeMismatch {
                ours: self.source_type,
                theirs: other.source_type,
            });
        }

        let (ours, theirs) = (self.ingredient_auis(), other.ingredient_auis());
        let same_ingredients = !ours.is_empty() && ours == theirs;
        if self.is_copack() != other.is_copack() && !same_ingredients {
            return Err(MergeRejection::CopackMismatch);
        }
        if !ours.is_empty() && !theirs.is_empty() && ours != theirs {
            return Err(MergeRejection::IngredientMismatch);
        }

        let product_agrees = self.exact_product_match(other)
            || self.contains_product_cuis(other)
            || other.contains_product_cuis(self);
        if !product_agrees {
            if !self.shares_nda(other) {
                return Err(MergeRejection::NoAgreement);
            }
            if ours != theirs {
                return Err(MergeRejection::NdaOnlyIngredientMismatch);
            }
        }
        Ok(())
    }

    /// Absorb another product group.
    ///
    /// Codes, GUID bookkeeping and all six buckets are unioned. On rejection
    /// the aggregate is left unchanged.
    pub fn merge_product_group(&mut self, other: &ProductAggregate) -> Result<()> {
        self.check_merge(other)?;

        union_codes(&mut self.codes, &other.codes);

        if other.guid == self.guid {
            for (file, processed) in &other.files {
                *self.files.entry(file.clone()).or_insert(false) |= *processed;
            }
        }
        for (guid, files) in &other.merged_guids {
            self.merged_guids
                .entry(guid.clone())
                .or_default()
                .extend(files.iter().cloned());
        }
        if !other.guid.is_empty() {
            self.merged_guids
                .entry(other.guid.clone())
                .or_default()
                .extend(other.files.keys().cloned());
        }
        for (guid, date) in &other.approval_dates {
            self.approval_dates
                .entry(guid.clone())
                .and_modify(|d| *d = (*d).min(*date))
                .or_insert(*date);
        }
        for (guid, nda) in &other.ndas {
            self.ndas.entry(guid.clone()).or_insert(*nda);
        }
        for (nda, dates) in &other.label_changes {
            self.label_changes.entry(*nda).or_default().extend(dates.iter().copied());
        }
        self.label_date = self.label_date.max(other.label_date);
        if self.sponsor.is_none() {
            self.sponsor.clone_from(&other.sponsor);
        }

        self.update_labels(other);
        trace!(into = %self.guid, from = %other.guid, "Merged product group");
        Ok(())
    }

    /// Merge all six buckets of another aggregate into ours
    pub fn update_labels(&mut self, other: &ProductAggregate) {
        self.labels.merge(&other.labels);
    }

    /// Fold a safety label change into the warning and boxed-warning
    /// buckets, then resolve labeled events.
    ///
    /// Terms the product already carries keep their sources and take the
    /// change's date if it is earlier; new terms are attributed to this
    /// product's GUID. Returns the number of atoms added.
    pub fn update_from_srlc(&mut self, change: &LabelChange) -> usize {
        let mut added = 0;
        for (section, class) in CHANGE_BUCKETS {
            added += self
                .labels
                .get_mut(section, class)
                .absorb_label_change(change.bucket(section, class), &self.guid);
        }
        self.label_changes
            .entry(change.application_number)
            .or_default()
            .insert(change.date);
        self.resolve_labeled_events();
        added
    }

    /// Drop events that a stronger bucket already explains.
    ///
    /// Indication atoms leave the warning and blackbox buckets, and exact
    /// atoms leave the algorithmic bucket of the same section. Returns the
    /// number of atoms removed.
    pub fn resolve_labeled_events(&mut self) -> usize {
        let labels = &mut self.labels;
        let exact_indications = aui_set(&labels.exact_indications);
        let mut indications = aui_set(&labels.algorithmic_indications);
        indications.extend(exact_indications.iter().cloned());

        let mut removed = labels.algorithmic_indications.remove_auis(&exact_indications);
        for bucket in [
            &mut labels.exact_warnings,
            &mut labels.algorithmic_warnings,
            &mut labels.exact_blackbox,
            &mut labels.algorithmic_blackbox,
        ] {
            removed += bucket.remove_auis(&indications);
        }
        let exact_blackbox = aui_set(&labels.exact_blackbox);
        removed += labels.algorithmic_blackbox.remove_auis(&exact_blackbox);
        let exact_warnings = aui_set(&labels.exact_warnings);
        removed += labels.algorithmic_warnings.remove_auis(&exact_warnings);
        removed
    }

    /// Reconcile dates inside each bucket by concept id
    pub fn reconcile_first_observed(&mut self) {
        for bucket in self.labels.iter_mut() {
            bucket.reconcile_first_observed();
        }
    }

    /// Share the earliest date per concept id across the two indication
    /// buckets and across the four warning and blackbox buckets.
    ///
    /// With `by_pt_key` the earliest date is also shared between atoms that
    /// roll up to the same preferred term.
    pub fn reconcile_across_sections(&mut self, by_pt_key: bool) {
        let LabelBuckets {
            exact_indications,
            algorithmic_indications,
            exact_warnings,
            algorithmic_warnings,
            exact_blackbox,
            algorithmic_blackbox,
        } = &mut self.labels;

        let mut keys: Vec<AtomKey> = vec![by_cui];
        if by_pt_key {
            keys.push(Atom::pt_key);
        }
        for key in keys {
            reconcile_group(&mut [&mut *exact_indications, &mut *algorithmic_indications], key);
            reconcile_group(
                &mut [
                    &mut *exact_warnings,
                    &mut *algorithmic_warnings,
                    &mut *exact_blackbox,
                    &mut *algorithmic_blackbox,
                ],
                key,
            );
        }
    }

    /// Whether any exact bucket records an observation before `date`
    pub fn has_data_prior(&self, date: LabelDate) -> bool {
        [
            &self.labels.exact_indications,
            &self.labels.exact_warnings,
            &self.labels.exact_blackbox,
        ]
        .into_iter()
        .any(|b| b.dates().any(|(_, d)| d < date))
    }

    /// Whether an exact warning or blackbox atom was first observed strictly
    /// between `start` and `end`
    pub fn has_new_label(&self, start: LabelDate, end: LabelDate) -> bool {
        [&self.labels.exact_warnings, &self.labels.exact_blackbox]
            .into_iter()
            .any(|b| b.dates().any(|(_, d)| d > start && d < end))
    }

    /// Distinct concept ids across the indication buckets
    pub fn indication_cuis(&self) -> BTreeSet<String> {
        cuis_of([&self.labels.exact_indications, &self.labels.algorithmic_indications])
    }

    /// Distinct concept ids across the warning and blackbox buckets
    pub fn adverse_event_cuis(&self) -> BTreeSet<String> {
        cuis_of([
            &self.labels.exact_warnings,
            &self.labels.algorithmic_warnings,
            &self.labels.exact_blackbox,
            &self.labels.algorithmic_blackbox,
        ])
    }
}

fn aui_set(bucket: &MatchBucket) -> BTreeSet<String> {
    bucket.auis().map(str::to_string).collect()
}

fn cuis_of<'a>(buckets: impl IntoIterator<Item = &'a MatchBucket>) -> BTreeSet<String> {
    buckets
        .into_iter()
        .flat_map(|b| b.iter())
        .filter(|a| !a.cui.is_empty())
        .map(|a| a.cui.clone())
        .collect()
}

fn reconcile_group(group: &mut [&mut MatchBucket], key: AtomKey) {
    let mut earliest = BTreeMap::new();
    for bucket in group.iter() {
        bucket.collect_earliest(key, &mut earliest);
    }
    for bucket in group.iter_mut() {
        bucket.lower_dates(key, &earliest);
    }
}

fn union_codes(ours: &mut ProductCodes, theirs: &ProductCodes) {
    for (own, other) in [
        (&mut ours.products, &theirs.products),
        (&mut ours.snomed, &theirs.snomed),
        (&mut ours.ingredients, &theirs.ingredients),
        (&mut ours.rxnorm, &theirs.rxnorm),
        (&mut ours.atc, &theirs.atc),
    ] {
        for (aui, code) in other {
            own.entry(aui.clone()).or_insert_with(|| code.clone());
        }
    }
    for (own, other) in [
        (&mut ours.raw_ndc_codes, &theirs.raw_ndc_codes),
        (&mut ours.product_cuis, &theirs.product_cuis),
        (&mut ours.snomed_parent_auis, &theirs.snomed_parent_auis),
    ] {
        for value in other {
            if !own.contains(value) {
                own.push(value.clone());
            }
        }
    }
}
