//! Match buckets: the atoms a product's labels carry for one section and pass

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use splfacts_domain::{Atom, LabelDate, MatchClass, SectionKind};

/// Key an atom is grouped under when dates are reconciled
pub(crate) type AtomKey = for<'a> fn(&'a Atom) -> Option<&'a str>;

/// Group atoms by concept id
pub(crate) fn by_cui(atom: &Atom) -> Option<&str> {
    (!atom.cui.is_empty()).then_some(atom.cui.as_str())
}

/// Atoms observed for one section and match class.
///
/// Besides the atoms themselves a bucket records the date each atom was
/// first observed and which source documents reported it. Every aui in the
/// date and source maps is in the atom set, and dates only move earlier
/// under [`MatchBucket::merge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchBucket {
    section: SectionKind,
    class: MatchClass,
    atoms: BTreeMap<String, Atom>,
    first_observed: BTreeMap<String, LabelDate>,
    sources: BTreeMap<String, Vec<String>>,
}

impl MatchBucket {
    /// Create an empty bucket
    pub fn new(section: SectionKind, class: MatchClass) -> Self {
        Self {
            section,
            class,
            atoms: BTreeMap::new(),
            first_observed: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Section this bucket collects
    pub fn section(&self) -> SectionKind {
        self.section
    }

    /// Match class this bucket collects
    pub fn class(&self) -> MatchClass {
        self.class
    }

    /// Indication bucket
    pub fn is_indication(&self) -> bool {
        self.section == SectionKind::Indication
    }

    /// Adverse-event (warning) bucket
    pub fn is_warning(&self) -> bool {
        self.section == SectionKind::AdverseEvent
    }

    /// Boxed-warning bucket
    pub fn is_blackbox(&self) -> bool {
        self.section == SectionKind::BoxedWarning
    }

    /// Filled by the exact pass
    pub fn is_exact(&self) -> bool {
        self.class.is_exact()
    }

    /// Number of atoms
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the bucket holds no atoms
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Whether the atom is present
    pub fn contains(&self, aui: &str) -> bool {
        self.atoms.contains_key(aui)
    }

    /// Borrow an atom
    pub fn atom(&self, aui: &str) -> Option<&Atom> {
        self.atoms.get(aui)
    }

    /// First-observed date of an atom
    pub fn date_of(&self, aui: &str) -> Option<LabelDate> {
        self.first_observed.get(aui).copied()
    }

    /// First-observed dates in aui order
    pub fn dates(&self) -> impl Iterator<Item = (&str, LabelDate)> {
        self.first_observed.iter().map(|(aui, d)| (aui.as_str(), *d))
    }

    /// Atom ids in order
    pub fn auis(&self) -> impl Iterator<Item = &str> {
        self.atoms.keys().map(String::as_str)
    }

    /// Atoms in aui order
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    /// Owned copy of the atoms
    pub fn atoms(&self) -> Vec<Atom> {
        self.atoms.values().cloned().collect()
    }

    /// Owned copy of the first-observed dates
    pub fn first_observed(&self) -> BTreeMap<String, LabelDate> {
        self.first_observed.clone()
    }

    /// Owned copy of the per-source atom lists
    pub fn sources(&self) -> BTreeMap<String, Vec<String>> {
        self.sources.clone()
    }

    /// Record an atom reported by a source document.
    ///
    /// An existing atom keeps its record; the date only ever moves earlier.
    /// A blank source id records the atom without attributing it.
    pub fn add_atom(&mut self, source: &str, atom: &Atom, date: Option<LabelDate>) {
        self.atoms
            .entry(atom.aui.clone())
            .or_insert_with(|| atom.clone());
        if let Some(date) = date {
            self.observe(&atom.aui, date);
        }
        if !source.is_empty() {
            attribute(self.sources.entry(source.to_string()).or_default(), &atom.aui);
        }
    }

    fn observe(&mut self, aui: &str, date: LabelDate) {
        self.first_observed
            .entry(aui.to_string())
            .and_modify(|d| *d = (*d).min(date))
            .or_insert(date);
    }

    /// Union another bucket into this one.
    ///
    /// Atom sets and per-source lists are unioned and the earliest date wins,
    /// then dates are reconciled across atoms sharing a concept id.
    pub fn merge(&mut self, other: &MatchBucket) {
        for (aui, atom) in &other.atoms {
            self.atoms.entry(aui.clone()).or_insert_with(|| atom.clone());
        }
        for (aui, date) in &other.first_observed {
            self.observe(aui, *date);
        }
        for (source, auis) in &other.sources {
            let own = self.sources.entry(source.clone()).or_default();
            for aui in auis {
                attribute(own, aui);
            }
        }
        self.reconcile_first_observed();
    }

    /// Fold in the terms of a safety label change.
    ///
    /// Atoms already present keep their sources and take the change's date
    /// if it is earlier. New atoms are attributed to `owner`. Returns the
    /// number of atoms added.
    pub fn absorb_label_change(&mut self, change: &MatchBucket, owner: &str) -> usize {
        let before = self.atoms.len();
        for (aui, atom) in &change.atoms {
            let date = change.date_of(aui);
            if self.atoms.contains_key(aui) {
                if let Some(date) = date {
                    self.observe(aui, date);
                }
            } else {
                self.add_atom(owner, atom, date);
            }
        }
        self.reconcile_first_observed();
        self.atoms.len() - before
    }

    /// Propagate the earliest date to every atom sharing a concept id
    pub fn reconcile_first_observed(&mut self) {
        let mut earliest = BTreeMap::new();
        self.collect_earliest(by_cui, &mut earliest);
        self.lower_dates(by_cui, &earliest);
    }

    /// Remove atoms, pruning their dates and source entries.
    ///
    /// Returns the number of atoms removed.
    pub fn remove_auis(&mut self, auis: &BTreeSet<String>) -> usize {
        self.retain(|atom| !auis.contains(&atom.aui))
    }

    /// Keep only the atoms the predicate accepts.
    ///
    /// Returns the number of atoms removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Atom) -> bool) -> usize {
        let before = self.atoms.len();
        self.atoms.retain(|_, atom| keep(atom));
        let removed = before - self.atoms.len();
        if removed > 0 {
            let atoms = &self.atoms;
            self.first_observed.retain(|aui, _| atoms.contains_key(aui));
            for list in self.sources.values_mut() {
                list.retain(|aui| atoms.contains_key(aui));
            }
            self.sources.retain(|_, list| !list.is_empty());
        }
        removed
    }

    /// Earliest date per grouping key, folded into `into`
    pub(crate) fn collect_earliest(&self, key: AtomKey, into: &mut BTreeMap<String, LabelDate>) {
        for (aui, date) in &self.first_observed {
            let Some(k) = self.atoms.get(aui).and_then(key) else {
                continue;
            };
            into.entry(k.to_string())
                .and_modify(|d| *d = (*d).min(*date))
                .or_insert(*date);
        }
    }

    /// Lower every atom's date to the earliest recorded for its key
    pub(crate) fn lower_dates(&mut self, key: AtomKey, earliest: &BTreeMap<String, LabelDate>) {
        for (aui, atom) in &self.atoms {
            let Some(date) = key(atom).and_then(|k| earliest.get(k)).copied() else {
                continue;
            };
            self.first_observed
                .entry(aui.clone())
                .and_modify(|d| *d = (*d).min(date))
                .or_insert(date);
        }
    }
}

/// Sorted insert without duplicates
fn attribute(list: &mut Vec<String>, aui: &str) {
    if let Err(at) = list.binary_search_by(|existing| existing.as_str().cmp(aui)) {
        list.insert(at, aui.to_string());
    }
}

/// The six buckets a product carries: exact and algorithmic matches for
/// indications, adverse events (warnings) and boxed warnings (blackbox)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBuckets {
    /// Exact indication matches
    pub exact_indications: MatchBucket,
    /// Algorithmic indication matches
    pub algorithmic_indications: MatchBucket,
    /// Exact adverse-event matches
    pub exact_warnings: MatchBucket,
    /// Algorithmic adverse-event matches
    pub algorithmic_warnings: MatchBucket,
    /// Exact boxed-warning matches
    pub exact_blackbox: MatchBucket,
    /// Algorithmic boxed-warning matches
    pub algorithmic_blackbox: MatchBucket,
}

impl Default for LabelBuckets {
    fn default() -> Self {
        use MatchClass::{Algorithmic, Exact};
        use SectionKind::{AdverseEvent, BoxedWarning, Indication};
        Self {
            exact_indications: MatchBucket::new(Indication, Exact),
            algorithmic_indications: MatchBucket::new(Indication, Algorithmic),
            exact_warnings: MatchBucket::new(AdverseEvent, Exact),
            algorithmic_warnings: MatchBucket::new(AdverseEvent, Algorithmic),
            exact_blackbox: MatchBucket::new(BoxedWarning, Exact),
            algorithmic_blackbox: MatchBucket::new(BoxedWarning, Algorithmic),
        }
    }
}

impl LabelBuckets {
    /// Bucket for a section and match class
    pub fn get(&self, section: SectionKind, class: MatchClass) -> &MatchBucket {
        match (section, class) {
            (SectionKind::Indication, MatchClass::Exact) => &self.exact_indications,
            (SectionKind::Indication, MatchClass::Algorithmic) => &self.algorithmic_indications,
            (SectionKind::AdverseEvent, MatchClass::Exact) => &self.exact_warnings,
            (SectionKind::AdverseEvent, MatchClass::Algorithmic) => &self.algorithmic_warnings,
            (SectionKind::BoxedWarning, MatchClass::Exact) => &self.exact_blackbox,
            (SectionKind::BoxedWarning, MatchClass::Algorithmic) => &self.algorithmic_blackbox,
        }
    }

    /// Mutable bucket for a section and match class
    pub fn get_mut(&mut self, section: SectionKind, class: MatchClass) -> &mut MatchBucket {
        match (section, class) {
            (SectionKind::Indication, MatchClass::Exact) => &mut self.exact_indications,
            (SectionKind::Indication, MatchClass::Algorithmic) => &mut self.algorithmic_indications,
            (SectionKind::AdverseEvent, MatchClass::Exact) => &mut self.exact_warnings,
            (SectionKind::AdverseEvent, MatchClass::Algorithmic) => &mut self.algorithmic_warnings,
            (SectionKind::BoxedWarning, MatchClass::Exact) => &mut self.exact_blackbox,
            (SectionKind::BoxedWarning, MatchClass::Algorithmic) => &mut self.algorithmic_blackbox,
        }
    }

    /// All six buckets
    pub fn iter(&self) -> impl Iterator<Item = &MatchBucket> {
        [
            &self.exact_indications,
            &self.algorithmic_indications,
            &self.exact_warnings,
            &self.algorithmic_warnings,
            &self.exact_blackbox,
            &self.algorithmic_blackbox,
        ]
        .into_iter()
    }

    /// All six buckets, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MatchBucket> {
        [
            &mut self.exact_indications,
            &mut self.algorithmic_indications,
            &mut self.exact_warnings,
            &mut self.algorithmic_warnings,
            &mut self.exact_blackbox,
            &mut self.algorithmic_blackbox,
        ]
        .into_iter()
    }

    /// Merge every bucket with its counterpart
    pub fn merge(&mut self, other: &LabelBuckets) {
        for (own, theirs) in self.iter_mut().zip(other.iter()) {
            own.merge(theirs);
        }
    }

    /// Whether every bucket is empty
    pub fn is_empty(&self) -> bool {
        self.iter().all(MatchBucket::is_empty)
    }

    /// Total atoms across buckets
    pub fn atom_count(&self) -> usize {
        self.iter().map(MatchBucket::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splfacts_domain::ConceptType;

    fn date(s: &str) -> LabelDate {
        LabelDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn atom(cui: &str, aui: &str) -> Atom {
        Atom::new(cui, aui, aui, ConceptType::Preferred, aui)
    }

    fn bucket() -> MatchBucket {
        MatchBucket::new(SectionKind::AdverseEvent, MatchClass::Exact)
    }

    #[test]
    fn test_add_atom_keeps_earliest_date() {
        let mut b = bucket();
        b.add_atom("doc-1", &atom("C1", "A1"), Some(date("2019-03-01")));
        b.add_atom("doc-2", &atom("C1", "A1"), Some(date("2018-03-01")));
        b.add_atom("doc-3", &atom("C1", "A1"), Some(date("2020-03-01")));
        b.add_atom("doc-3", &atom("C1", "A1"), None);

        assert_eq!(b.len(), 1);
        assert_eq!(b.date_of("A1"), Some(date("2018-03-01")));
        assert_eq!(b.sources().len(), 3);
        assert_eq!(b.sources()["doc-3"], vec!["A1"]);
    }

    #[test]
    fn test_atom_without_date_or_source() {
        let mut b = bucket();
        b.add_atom("", &atom("C1", "A1"), None);
        assert!(b.contains("A1"));
        assert!(b.first_observed().is_empty());
        assert!(b.sources().is_empty());
    }

    #[test]
    fn test_reconcile_shares_date_within_cui() {
        let mut b = bucket();
        b.add_atom("d", &atom("C1", "A1"), Some(date("2019-01-01")));
        b.add_atom("d", &atom("C1", "A2"), Some(date("2017-01-01")));
        b.add_atom("d", &atom("C2", "A3"), Some(date("2016-01-01")));
        b.reconcile_first_observed();

        assert_eq!(b.date_of("A1"), Some(date("2017-01-01")));
        assert_eq!(b.date_of("A2"), Some(date("2017-01-01")));
        assert_eq!(b.date_of("A3"), Some(date("2016-01-01")));
    }

    #[test]
    fn test_label_change_keeps_sources_and_lowers_dates() {
        let mut b = bucket();
        b.add_atom("doc-1", &atom("C1", "A1"), Some(date("2019-01-01")));
        let mut change = bucket();
        change.add_atom("NDA012345", &atom("C1", "A1"), Some(date("2018-06-01")));
        change.add_atom("NDA012345", &atom("C2", "A2"), Some(date("2018-06-01")));

        assert_eq!(b.absorb_label_change(&change, "g1"), 1);
        assert_eq!(b.date_of("A1"), Some(date("2018-06-01")));
        assert_eq!(b.date_of("A2"), Some(date("2018-06-01")));
        let sources = b.sources();
        assert_eq!(sources["doc-1"], vec!["A1"]);
        assert_eq!(sources["g1"], vec!["A2"]);
        assert!(!sources.contains_key("NDA012345"));

        assert_eq!(b.absorb_label_change(&change, "g1"), 0);
        assert_eq!(b.sources(), sources);
    }

    #[test]
    fn test_remove_prunes_dates_and_sources() {
        let mut b = bucket();
        b.add_atom("d1", &atom("C1", "A1"), Some(date("2019-01-01")));
        b.add_atom("d1", &atom("C2", "A2"), Some(date("2019-01-01")));
        b.add_atom("d2", &atom("C2", "A2"), None);

        let removed = b.remove_auis(&BTreeSet::from(["A2".to_string()]));
        assert_eq!(removed, 1);
        assert_eq!(b.first_observed().keys().collect::<Vec<_>>(), vec!["A1"]);
        assert_eq!(b.sources().keys().collect::<Vec<_>>(), vec!["d1"]);
    }

    #[test]
    fn test_accessors_return_copies() {
        let mut b = bucket();
        b.add_atom("d", &atom("C1", "A1"), Some(date("2019-01-01")));

        let mut atoms = b.atoms();
        atoms.clear();
        let mut dates = b.first_observed();
        dates.insert("A9".to_string(), date("2000-01-01"));

        assert_eq!(b.len(), 1);
        assert_eq!(b.date_of("A9"), None);
    }

    #[test]
    fn test_label_buckets_address_by_section_and_class() {
        let mut labels = LabelBuckets::default();
        labels
            .get_mut(SectionKind::BoxedWarning, MatchClass::Algorithmic)
            .add_atom("d", &atom("C1", "A1"), None);

        assert!(labels.algorithmic_blackbox.contains("A1"));
        assert!(labels.algorithmic_blackbox.is_blackbox());
        assert!(!labels.algorithmic_blackbox.is_exact());
        assert_eq!(labels.atom_count(), 1);
        assert_eq!(labels.iter().count(), 6);
    }
}
