//! Product merger: folds per-label aggregates into products

use std::collections::{BTreeMap, BTreeSet, HashMap};

use splfacts_domain::LabelDate;
use tracing::{debug, error, info, warn};

use crate::product::ProductAggregate;

/// Grouping pass a merge happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePass {
    /// Same single product concept id
    ProductConcept,
    /// Same set of product concept ids
    MultiConceptKey,
    /// Single-concept product folded into a multi-concept product
    SingleOntoMulti,
    /// Same primary NDA
    Nda,
    /// SNOMED parents contained
    SnomedParent,
    /// Same RxNorm ingredients
    Ingredients,
    /// A GUID in common
    SharedGuid,
    /// Same ATC classes
    AtcClass,
    /// A normalized NDC in common
    Ndc,
    /// Same id from an earlier run
    PriorId,
}

impl MergePass {
    /// Passes in execution order
    pub const ALL: [MergePass; 10] = [
        MergePass::ProductConcept,
        MergePass::MultiConceptKey,
        MergePass::SingleOntoMulti,
        MergePass::Nda,
        MergePass::SnomedParent,
        MergePass::Ingredients,
        MergePass::SharedGuid,
        MergePass::AtcClass,
        MergePass::Ndc,
        MergePass::PriorId,
    ];

    /// Name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePass::ProductConcept => "product_concept",
            MergePass::MultiConceptKey => "multi_concept_key",
            MergePass::SingleOntoMulti => "single_onto_multi",
            MergePass::Nda => "nda",
            MergePass::SnomedParent => "snomed_parent",
            MergePass::Ingredients => "ingredients",
            MergePass::SharedGuid => "shared_guid",
            MergePass::AtcClass => "atc_class",
            MergePass::Ndc => "ndc",
            MergePass::PriorId => "prior_id",
        }
    }
}

/// Reference data stamped onto products after grouping
#[derive(Debug, Clone, Default)]
pub struct MergeReference {
    /// Approval date per NDA number
    pub approval_dates: BTreeMap<u32, LabelDate>,

    /// Sponsor per NDA number
    pub sponsors: BTreeMap<u32, String>,

    /// Product id per GUID from an earlier run
    pub prior_ids: BTreeMap<String, i64>,
}

/// Counts collected during [`ProductMerger::merge_all`]
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Products absorbed per pass
    pub merged: HashMap<MergePass, usize>,

    /// Merges refused by a guard
    pub rejected: usize,

    /// Products going in
    pub input: usize,

    /// Products coming out
    pub kept: usize,

    /// Products whose GUIDs map to more than one prior id
    pub prior_id_conflicts: usize,

    /// GUIDs claimed by more than one kept product
    pub duplicate_guids: Vec<String>,
}

impl MergeReport {
    /// Record a merge
    pub fn record_merge(&mut self, pass: MergePass) {
        *self.merged.entry(pass).or_insert(0) += 1;
    }

    /// Record a refused merge
    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    /// Merges in one pass
    pub fn merged_in(&self, pass: MergePass) -> usize {
        self.merged.get(&pass).copied().unwrap_or(0)
    }

    /// Total merges across passes
    pub fn total_merged(&self) -> usize {
        self.merged.values().sum()
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Merge Summary".to_string(),
            "=============".to_string(),
            format!("Products in: {}", self.input),
            format!("Products kept: {}", self.kept),
            format!("Merges refused: {}", self.rejected),
            String::new(),
            "Merges by pass:".to_string(),
        ];
        for pass in MergePass::ALL {
            let count = self.merged_in(pass);
            if count > 0 {
                lines.push(format!("  {}: {}", pass.as_str(), count));
            }
        }
        if self.prior_id_conflicts > 0 {
            lines.push(format!("Prior id conflicts: {}", self.prior_id_conflicts));
        }
        if !self.duplicate_guids.is_empty() {
            lines.push(format!("Duplicate GUIDs: {}", self.duplicate_guids.join(", ")));
        }
        lines.join("\n")
    }
}

/// Groups product aggregates that describe the same product.
///
/// Passes run in a fixed order from the most to the least specific
/// evidence. An absorbed product has its `save` flag cleared and is pruned
/// at the end.
#[derive(Debug, Clone, Default)]
pub struct ProductMerger {
    reference: MergeReference,
}

impl ProductMerger {
    /// Create a merger with reference data
    pub fn new(reference: MergeReference) -> Self {
        Self { reference }
    }

    /// Run every pass and return the surviving products
    pub fn merge_all(&self, mut products: Vec<ProductAggregate>) -> (Vec<ProductAggregate>, MergeReport) {
        let mut report = MergeReport {
            input: products.len(),
            ..MergeReport::default()
        };
        let p = products.as_mut_slice();

        merge_by_keys(p, MergePass::ProductConcept, &mut report, |prd| {
            let cuis = prd.product_cuis();
            match cuis.len() {
                1 => cuis.into_iter().map(str::to_string).collect(),
                _ => Vec::new(),
            }
        });
        merge_by_keys(p, MergePass::MultiConceptKey, &mut report, |prd| {
            if prd.product_cuis().len() > 1 {
                vec![prd.multi_cui_key()]
            } else {
                Vec::new()
            }
        });
        merge_single_onto_multi(p, &mut report);
        merge_by_keys(p, MergePass::Nda, &mut report, |prd| {
            prd.primary_nda().map(|n| n.to_string()).into_iter().collect()
        });
        merge_where(p, MergePass::SnomedParent, &mut report, ProductAggregate::has_snomed_parents);
        merge_where(
            p,
            MergePass::Ingredients,
            &mut report,
            ProductAggregate::has_exact_rxnorm_ingredients,
        );
        resolve_saved(p);

        merge_by_keys(p, MergePass::SharedGuid, &mut report, |prd| {
            prd.all_guids().into_iter().map(str::to_string).collect()
        });
        merge_where(p, MergePass::AtcClass, &mut report, ProductAggregate::has_exact_atc_class);
        resolve_saved(p);

        merge_by_keys(p, MergePass::Ndc, &mut report, |prd| {
            prd.normalized_ndc_codes().into_iter().collect()
        });

        self.stamp_reference(p);
        self.carry_prior_ids(p, &mut report);

        products.retain(|prd| prd.save);
        report.kept = products.len();
        report.duplicate_guids = duplicate_guids(&products);
        if !report.duplicate_guids.is_empty() {
            error!(guids = ?report.duplicate_guids, "GUIDs claimed by more than one product");
        }

        info!(
            input = report.input,
            kept = report.kept,
            merged = report.total_merged(),
            rejected = report.rejected,
            "Product merge complete"
        );
        (products, report)
    }

    fn stamp_reference(&self, products: &mut [ProductAggregate]) {
        for prd in products.iter_mut().filter(|prd| prd.save) {
            let stamped: Vec<(String, LabelDate)> = prd
                .ndas
                .iter()
                .filter_map(|(guid, nda)| {
                    self.reference
                        .approval_dates
                        .get(nda)
                        .map(|date| (guid.clone(), *date))
                })
                .collect();
            prd.approval_dates.extend(stamped);

            if let Some(sponsor) = prd.primary_nda().and_then(|nda| self.reference.sponsors.get(&nda)) {
                prd.sponsor = Some(sponsor.clone());
            }
        }
    }

    fn carry_prior_ids(&self, products: &mut [ProductAggregate], report: &mut MergeReport) {
        if self.reference.prior_ids.is_empty() {
            return;
        }
        let mut owners: BTreeMap<i64, usize> = BTreeMap::new();
        for j in 0..products.len() {
            if !products[j].save {
                continue;
            }
            let ids: BTreeSet<i64> = products[j]
                .all_guids()
                .into_iter()
                .filter_map(|guid| self.reference.prior_ids.get(guid).copied())
                .collect();
            let Some(&prior) = ids.first() else {
                continue;
            };
            if ids.len() > 1 {
                warn!(guid = %products[j].guid, ?ids, "Product maps to several prior ids");
                report.prior_id_conflicts += 1;
            }
            match owners.get(&prior) {
                Some(&owner) => {
                    if !merge_pair(products, owner, j, MergePass::PriorId, report) {
                        warn!(guid = %products[j].guid, prior, "Prior id already carried by another product");
                    }
                }
                None => {
                    products[j].prior_id = Some(prior);
                    owners.insert(prior, j);
                }
            }
        }
    }
}

/// Eligible to take part in a pass
fn live(prd: &ProductAggregate) -> bool {
    prd.save && !prd.guid.trim().is_empty()
}

/// Borrow one product mutably and another shared
fn pair_mut(products: &mut [ProductAggregate], into: usize, from: usize) -> (&mut ProductAggregate, &ProductAggregate) {
    if into < from {
        let (left, right) = products.split_at_mut(from);
        (&mut left[into], &right[0])
    } else {
        let (left, right) = products.split_at_mut(into);
        (&mut right[0], &left[from])
    }
}

/// Merge `from` into `into`; the absorbed product stops being saved
fn merge_pair(
    products: &mut [ProductAggregate],
    into: usize,
    from: usize,
    pass: MergePass,
    report: &mut MergeReport,
) -> bool {
    if into == from || !live(&products[into]) || !live(&products[from]) {
        return false;
    }
    let (target, incoming) = pair_mut(products, into, from);
    match target.merge_product_group(incoming) {
        Ok(()) => {
            debug!(pass = pass.as_str(), into = %target.guid, from = %incoming.guid, "Products merged");
            products[from].save = false;
            report.record_merge(pass);
            true
        }
        Err(reason) => {
            debug!(pass = pass.as_str(), into = %target.guid, from = %incoming.guid, %reason, "Merge refused");
            report.record_rejection();
            false
        }
    }
}

/// Products sharing any key merge into the first product that holds it
fn merge_by_keys(
    products: &mut [ProductAggregate],
    pass: MergePass,
    report: &mut MergeReport,
    keys_of: impl Fn(&ProductAggregate) -> Vec<String>,
) {
    let before = report.merged_in(pass);
    let mut owners: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for j in 0..products.len() {
        if !live(&products[j]) {
            continue;
        }
        let keys = keys_of(&products[j]);
        if keys.is_empty() {
            continue;
        }
        let mut targets: Vec<usize> = Vec::new();
        for owner in keys.iter().filter_map(|k| owners.get(k)).flatten() {
            if !targets.contains(owner) {
                targets.push(*owner);
            }
        }
        let absorbed = targets
            .into_iter()
            .any(|i| merge_pair(products, i, j, pass, report));
        if !absorbed {
            for key in keys {
                owners.entry(key).or_default().push(j);
            }
        }
    }
    info!(pass = pass.as_str(), merged = report.merged_in(pass) - before, "Merge pass complete");
}

/// Every ordered pair the predicate accepts merges right into left
fn merge_where(
    products: &mut [ProductAggregate],
    pass: MergePass,
    report: &mut MergeReport,
    agrees: impl Fn(&ProductAggregate, &ProductAggregate) -> bool,
) {
    let before = report.merged_in(pass);
    for i in 0..products.len() {
        for j in 0..products.len() {
            if i == j || !live(&products[i]) || !live(&products[j]) {
                continue;
            }
            if agrees(&products[i], &products[j]) {
                merge_pair(products, i, j, pass, report);
            }
        }
    }
    info!(pass = pass.as_str(), merged = report.merged_in(pass) - before, "Merge pass complete");
}

fn merge_single_onto_multi(products: &mut [ProductAggregate], report: &mut MergeReport) {
    let before = report.merged_in(MergePass::SingleOntoMulti);
    for j in 0..products.len() {
        if !live(&products[j]) {
            continue;
        }
        let single = products[j].product_cuis();
        if single.len() != 1 {
            continue;
        }
        let Some(cui) = single.into_iter().next().map(str::to_string) else {
            continue;
        };
        for i in 0..products.len() {
            let holds = {
                let cuis = products[i].product_cuis();
                i != j && cuis.len() > 1 && cuis.contains(cui.as_str())
            };
            if holds && merge_pair(products, i, j, MergePass::SingleOntoMulti, report) {
                break;
            }
        }
    }
    info!(
        pass = MergePass::SingleOntoMulti.as_str(),
        merged = report.merged_in(MergePass::SingleOntoMulti) - before,
        "Merge pass complete"
    );
}

fn resolve_saved(products: &mut [ProductAggregate]) {
    for prd in products.iter_mut().filter(|prd| prd.save) {
        prd.resolve_labeled_events();
    }
}

fn duplicate_guids(products: &[ProductAggregate]) -> Vec<String> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for prd in products {
        for guid in prd.all_guids() {
            *seen.entry(guid).or_insert(0) += 1;
        }
    }
    seen.into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(guid, _)| guid.to_string())
        .collect()
}
