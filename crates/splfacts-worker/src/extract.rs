//! Per-document extraction: section text in, aggregate with label terms out

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use splfacts_aggregate::{LabelBuckets, LabelChange, ProductAggregate};
use splfacts_dictionary::TermDictionary;
use splfacts_domain::{
    Atom, LabelDate, MatchClass, SafetyLabelChange, SectionContext, SectionKind, SourceDocument,
};
use splfacts_matcher::{MatchEngine, TermMatches};
use splfacts_registry::{composite_key, IdentityRegistry, KeyKind};
use tracing::{debug, warn};

use crate::config::WorkerConfig;
use crate::metrics::WorkerMetrics;

/// Runs both match passes over every section of a document.
///
/// For each section the exact pass runs first; the text it matched is
/// blanked out before the algorithmic pass so the stemmed index only sees
/// what the exact index could not place. Lower-level atoms are recorded
/// together with the preferred term they roll up to.
pub struct LabelExtractor {
    engine: Arc<MatchEngine>,
    exclusions: Vec<String>,
}

impl LabelExtractor {
    /// Create an extractor over a compiled engine
    pub fn new(engine: Arc<MatchEngine>, config: &WorkerConfig) -> Self {
        let exclusions = config
            .indication_exclusions
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self { engine, exclusions }
    }

    /// Engine used for matching
    pub fn engine(&self) -> &Arc<MatchEngine> {
        &self.engine
    }

    /// Build the aggregate for one document.
    ///
    /// The result carries the document's product metadata and the terms
    /// found in its sections, with labeled events already resolved.
    pub fn extract(
        &self,
        doc: &SourceDocument,
        registry: &IdentityRegistry,
        metrics: &mut WorkerMetrics,
    ) -> ProductAggregate {
        let mut aggregate = ProductAggregate::from_document(doc);

        for section in &doc.sections {
            let mut ctx = SectionContext::new(section.kind);
            if let Some(brand) = &doc.brand {
                ctx = ctx.with_brand(brand.as_str());
            }
            let pass = SectionPass {
                source: &doc.document_id,
                ctx: &ctx,
                text: &section.text,
                date: doc.section_date(section),
            };
            self.match_section(&mut aggregate.labels, &pass, registry, metrics);
        }

        metrics.indications_excluded += self.exclude_indications(&mut aggregate);
        metrics.labeled_events_resolved += aggregate.resolve_labeled_events();
        aggregate
    }

    /// Match the warning and boxed-warning text of a safety label change.
    ///
    /// Terms are attributed to the change's application number and dated
    /// by its supplement date. Returns `None` for a change without an
    /// application number or any date.
    pub fn extract_label_change(
        &self,
        record: &SafetyLabelChange,
        registry: &IdentityRegistry,
        metrics: &mut WorkerMetrics,
    ) -> Option<LabelChange> {
        let Some(mut change) = LabelChange::from_record(record) else {
            warn!(
                nda = record.application_number,
                drug = %record.drug_name,
                "Label change without application number or date skipped"
            );
            return None;
        };
        let (nda, date) = (record.application_number.to_string(), change.date.to_string());
        registry.intern(KeyKind::LabelChange, &composite_key(&[nda.as_str(), date.as_str()]));

        for section in &record.sections {
            if section.kind == SectionKind::Indication {
                continue;
            }
            let mut ctx = SectionContext::new(section.kind);
            if !record.drug_name.trim().is_empty() {
                ctx = ctx.with_brand(record.drug_name.as_str());
            }
            let source = change.source.clone();
            let pass = SectionPass {
                source: &source,
                ctx: &ctx,
                text: &section.text,
                date: Some(change.date),
            };
            self.match_section(&mut change.labels, &pass, registry, metrics);
        }

        metrics.labeled_events_resolved += change.resolve_labeled_events();
        debug!(
            nda = change.application_number,
            drug_id = ?record.drug_id(),
            terms = change.labels.atom_count(),
            "Label change matched"
        );
        Some(change)
    }

    /// Exact pass, exact-term removal, then the algorithmic pass
    fn match_section(
        &self,
        labels: &mut LabelBuckets,
        pass: &SectionPass<'_>,
        registry: &IdentityRegistry,
        metrics: &mut WorkerMetrics,
    ) {
        let section = pass.ctx.section;
        let exact = self.engine.match_text(pass.ctx, pass.text, true);
        let added = self.record(labels, pass, MatchClass::Exact, &exact);
        metrics.record_terms(section, MatchClass::Exact, added);
        registry.record_section_pass(section, MatchClass::Exact);

        let (remaining, removed) = remove_exact_terms(pass.text, exact.keys().map(String::as_str));
        metrics.exact_terms_removed += removed;

        let stemmed = self.engine.match_text(pass.ctx, &remaining, false);
        let added = self.record(labels, pass, MatchClass::Algorithmic, &stemmed);
        metrics.record_terms(section, MatchClass::Algorithmic, added);
        registry.record_section_pass(section, MatchClass::Algorithmic);

        debug!(
            source = %pass.source,
            section = %section,
            exact = exact.len(),
            algorithmic = stemmed.len(),
            "Section matched"
        );
    }

    fn record(&self, labels: &mut LabelBuckets, pass: &SectionPass<'_>, class: MatchClass, found: &TermMatches) -> usize {
        let dictionary: &TermDictionary = self.engine.dictionary();
        let bucket = labels.get_mut(pass.ctx.section, class);
        let before = bucket.len();

        for aui in found.values().flatten() {
            let Some(atom) = dictionary.atom(aui) else {
                warn!(aui = %aui, "Matched atom missing from dictionary");
                continue;
            };
            bucket.add_atom(pass.source, atom, pass.date);
            if let Some(preferred) = rolled_up(dictionary, atom) {
                bucket.add_atom(pass.source, preferred, pass.date);
            }
        }
        bucket.len() - before
    }

    fn exclude_indications(&self, aggregate: &mut ProductAggregate) -> usize {
        if self.exclusions.is_empty() {
            return 0;
        }
        let exclusions = &self.exclusions;
        [MatchClass::Exact, MatchClass::Algorithmic]
            .into_iter()
            .map(|class| {
                aggregate
                    .labels
                    .get_mut(SectionKind::Indication, class)
                    .retain(|atom| {
                        let term = atom.term.to_lowercase();
                        !exclusions.iter().any(|excluded| term.contains(excluded.as_str()))
                    })
            })
            .sum()
    }
}

/// One section of text to match
struct SectionPass<'a> {
    source: &'a str,
    ctx: &'a SectionContext,
    text: &'a str,
    date: Option<LabelDate>,
}

fn rolled_up<'a>(dictionary: &'a TermDictionary, atom: &Atom) -> Option<&'a Atom> {
    if !atom.tty.rolls_up_to_preferred() {
        return None;
    }
    dictionary.preferred_for(atom).filter(|pt| pt.aui != atom.aui)
}

/// Pattern matching any of the given keys as whole words, case-insensitive.
///
/// Keys are compared token by token; any run of non-alphanumeric characters
/// in the text may separate two tokens, so "non small cell" also matches
/// "non\u{2013}small cell". Longer keys are tried first.
fn exact_terms_pattern<'a>(keys: impl Iterator<Item = &'a str>) -> Option<Result<Regex, regex::Error>> {
    let mut alternatives: Vec<String> = keys
        .map(|key| {
            key.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[^\p{L}\p{N}]+")
        })
        .filter(|alt| !alt.is_empty())
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    alternatives.dedup();

    let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
    Some(RegexBuilder::new(&pattern).case_insensitive(true).build())
}

/// Blank out exact-pass keys in section text.
///
/// Returns the remaining text and the number of occurrences removed. If the
/// pattern cannot be built the text is returned unchanged.
pub fn remove_exact_terms<'a>(text: &str, keys: impl Iterator<Item = &'a str>) -> (String, usize) {
    let regex = match exact_terms_pattern(keys) {
        None => return (text.to_string(), 0),
        Some(Ok(regex)) => regex,
        Some(Err(e)) => {
            warn!("Exact terms kept in text: {}", e);
            return (text.to_string(), 0);
        }
    };
    let removed = regex.find_iter(text).count();
    (regex.replace_all(text, " ").into_owned(), removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_exact_terms_whole_words() {
        let (text, removed) = remove_exact_terms("Rash and rashes. RASH again.", ["rash"].into_iter());
        assert_eq!(removed, 2);
        assert_eq!(text, "  and rashes.   again.");
    }

    #[test]
    fn test_remove_exact_terms_across_punctuation() {
        let (text, removed) = remove_exact_terms(
            "treatment of non\u{2013}small cell lung cancer.",
            ["non small cell lung cancer", "lung cancer"].into_iter(),
        );
        assert_eq!(removed, 1);
        assert_eq!(text, "treatment of  .");
    }

    #[test]
    fn test_remove_exact_terms_escapes_keys() {
        let (text, removed) = remove_exact_terms("a (b) c", ["a+", "c"].into_iter());
        assert_eq!(removed, 1);
        assert_eq!(text, "a (b)  ");
    }

    #[test]
    fn test_no_keys_keeps_text() {
        let (text, removed) = remove_exact_terms("headache", std::iter::empty());
        assert_eq!(removed, 0);
        assert_eq!(text, "headache");
    }
}
