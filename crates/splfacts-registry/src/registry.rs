//! Natural-key registry shared by extraction workers

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use splfacts_domain::{MatchClass, SectionKind};
use tracing::debug;

use crate::ids::{IdAllocators, IdKind};

/// Separator between the parts of a composite key
pub const KEY_SEPARATOR: char = '\u{1}';

/// Join key parts with [`KEY_SEPARATOR`]
pub fn composite_key(parts: &[&str]) -> String {
    parts.join(&KEY_SEPARATOR.to_string())
}

/// Natural-key namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Product by GUID
    Product,
    /// Product code by (code, name) pair
    Code,
    /// Source document file by path
    SourceFile,
    /// Active ingredient by atom id
    Ingredient,
    /// RxNorm concept by atom id
    RxNorm,
    /// Package code by normalized NDC
    Ndc,
    /// Safety label change by (application number, supplement date)
    LabelChange,
}

impl KeyKind {
    /// Every key namespace
    pub const ALL: [KeyKind; 7] = [
        KeyKind::Product,
        KeyKind::Code,
        KeyKind::SourceFile,
        KeyKind::Ingredient,
        KeyKind::RxNorm,
        KeyKind::Ndc,
        KeyKind::LabelChange,
    ];

    /// Id counter new keys in this namespace draw from
    pub fn id_kind(self) -> IdKind {
        match self {
            KeyKind::Product => IdKind::Product,
            KeyKind::Code => IdKind::Code,
            KeyKind::SourceFile => IdKind::SourceFile,
            KeyKind::Ingredient => IdKind::Ingredient,
            KeyKind::RxNorm | KeyKind::Ndc => IdKind::ExternalRef,
            KeyKind::LabelChange => IdKind::LabelChange,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Entry counts for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Keys registered per namespace
    pub keys: Vec<(KeyKind, usize)>,
    /// Keys marked written
    pub written: usize,
    /// Section passes recorded
    pub section_passes: u64,
}

/// Identity and dedup registry.
///
/// One instance is shared by `Arc` across every worker of a run. Each
/// natural key maps to exactly one id; the first writer wins and later
/// writers get the winner's id back.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    ids: IdAllocators,
    keys: [DashMap<String, i64>; 7],
    written: DashSet<String>,
    section_passes: DashMap<(SectionKind, MatchClass), u64>,
}

impl IdentityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Id counters
    pub fn ids(&self) -> &IdAllocators {
        &self.ids
    }

    /// Register an id for a key unless one is already registered.
    ///
    /// Returns the id the key maps to afterwards.
    pub fn register(&self, kind: KeyKind, key: &str, id: i64) -> i64 {
        *self.keys[kind.index()]
            .entry(key.to_string())
            .or_insert(id)
    }

    /// Id for a key, allocating one from `id_kind` on first sight.
    ///
    /// Returns the id and whether it was allocated by this call. At most one
    /// id is ever allocated per key.
    pub fn get_or_allocate(&self, kind: KeyKind, key: &str, id_kind: IdKind) -> (i64, bool) {
        match self.keys[kind.index()].entry(key.to_string()) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let id = self.ids.next(id_kind);
                entry.insert(id);
                debug!(?kind, id, "Allocated id for new key");
                (id, true)
            }
        }
    }

    /// Id for a key from the namespace's own counter, allocated on first sight
    pub fn intern(&self, kind: KeyKind, key: &str) -> (i64, bool) {
        self.get_or_allocate(kind, key, kind.id_kind())
    }

    /// Registered id for a key
    pub fn lookup(&self, kind: KeyKind, key: &str) -> Option<i64> {
        self.keys[kind.index()].get(key).map(|id| *id)
    }

    /// Number of keys in a namespace
    pub fn key_count(&self, kind: KeyKind) -> usize {
        self.keys[kind.index()].len()
    }

    /// Mark a key written; true the first time only
    pub fn mark_written(&self, key: &str) -> bool {
        self.written.insert(key.to_string())
    }

    /// Whether a key has been written
    pub fn is_written(&self, key: &str) -> bool {
        self.written.contains(key)
    }

    /// Count one extraction pass over a section
    pub fn record_section_pass(&self, section: SectionKind, class: MatchClass) {
        *self.section_passes.entry((section, class)).or_insert(0) += 1;
    }

    /// Passes recorded for a section and match class
    pub fn section_passes(&self, section: SectionKind, class: MatchClass) -> u64 {
        self.section_passes
            .get(&(section, class))
            .map(|n| *n)
            .unwrap_or(0)
    }

    /// Snapshot of entry counts
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            keys: KeyKind::ALL
                .into_iter()
                .map(|kind| (kind, self.key_count(kind)))
                .collect(),
            written: self.written.len(),
            section_passes: self.section_passes.iter().map(|entry| *entry.value()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key(&["0002-3227", "Taxol"]), "0002-3227\u{1}Taxol");
        assert_eq!(composite_key(&["single"]), "single");
    }

    #[test]
    fn test_first_writer_wins() {
        let registry = IdentityRegistry::new();
        assert_eq!(registry.register(KeyKind::Product, "g1", 7), 7);
        assert_eq!(registry.register(KeyKind::Product, "g1", 9), 7);
        assert_eq!(registry.register(KeyKind::SourceFile, "g1", 9), 9);
        assert_eq!(registry.lookup(KeyKind::Product, "g1"), Some(7));
        assert_eq!(registry.lookup(KeyKind::Code, "g1"), None);
    }

    #[test]
    fn test_get_or_allocate() {
        let registry = IdentityRegistry::new();
        let key = composite_key(&["0002-3227", "Taxol"]);
        assert_eq!(registry.get_or_allocate(KeyKind::Code, &key, IdKind::Code), (100, true));
        assert_eq!(registry.get_or_allocate(KeyKind::Code, &key, IdKind::Code), (100, false));
        assert_eq!(registry.ids().peek(IdKind::Code), 101);
    }

    #[test]
    fn test_written_and_section_passes() {
        let registry = IdentityRegistry::new();
        assert!(registry.mark_written("k"));
        assert!(!registry.mark_written("k"));
        assert!(registry.is_written("k"));

        registry.record_section_pass(SectionKind::Indication, MatchClass::Exact);
        registry.record_section_pass(SectionKind::Indication, MatchClass::Exact);
        registry.record_section_pass(SectionKind::BoxedWarning, MatchClass::Algorithmic);
        assert_eq!(registry.section_passes(SectionKind::Indication, MatchClass::Exact), 2);
        assert_eq!(registry.section_passes(SectionKind::AdverseEvent, MatchClass::Exact), 0);

        let stats = registry.stats();
        assert_eq!(stats.written, 1);
        assert_eq!(stats.section_passes, 3);
    }

    #[test]
    fn test_concurrent_allocation_one_id_per_key() {
        let registry = Arc::new(IdentityRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..200)
                        .map(|n| registry.get_or_allocate(KeyKind::SourceFile, &format!("file-{n}"), IdKind::SourceFile))
                        .filter(|(_, fresh)| *fresh)
                        .count()
                })
            })
            .collect();

        let fresh: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(fresh, 200);
        assert_eq!(registry.key_count(KeyKind::SourceFile), 200);
        assert_eq!(registry.ids().peek(IdKind::SourceFile), 300);
    }

    #[test]
    fn test_reference_namespaces_are_separate() {
        let registry = IdentityRegistry::new();
        assert_eq!(registry.intern(KeyKind::Ingredient, "A100"), (100, true));
        assert_eq!(registry.intern(KeyKind::RxNorm, "A100"), (100, true));
        assert_eq!(registry.intern(KeyKind::Ndc, "00002322730"), (101, true));
        assert_eq!(registry.intern(KeyKind::Ingredient, "A100"), (100, false));
        assert_eq!(registry.ids().peek(IdKind::ExternalRef), 102);
        assert_eq!(registry.lookup(KeyKind::Ndc, "A100"), None);

        let stats = registry.stats();
        assert_eq!(stats.keys.len(), KeyKind::ALL.len());
        assert!(stats.keys.contains(&(KeyKind::RxNorm, 1)));
    }

    #[test]
    fn test_concurrent_reference_interning() {
        let registry = Arc::new(IdentityRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let mut fresh = 0;
                    for n in 0..100 {
                        let ndc = format!("{:011}", n);
                        for kind in [KeyKind::Ingredient, KeyKind::RxNorm, KeyKind::Ndc] {
                            let key = if kind == KeyKind::Ndc { ndc.clone() } else { format!("A{}", (n + t) % 100) };
                            fresh += usize::from(registry.intern(kind, &key).1);
                        }
                    }
                    fresh
                })
            })
            .collect();

        let fresh: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(fresh, 300);
        for kind in [KeyKind::Ingredient, KeyKind::RxNorm, KeyKind::Ndc] {
            assert_eq!(registry.key_count(kind), 100);
        }
        assert_eq!(registry.ids().peek(IdKind::Ingredient), 200);
        assert_eq!(registry.ids().peek(IdKind::ExternalRef), 300);

        let ids: std::collections::HashSet<i64> = (0..100)
            .filter_map(|n| registry.lookup(KeyKind::RxNorm, &format!("A{n}")))
            .chain((0..100).filter_map(|n| registry.lookup(KeyKind::Ndc, &format!("{:011}", n))))
            .collect();
        assert_eq!(ids.len(), 200);
    }
}
