//! Monotonic id counters

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RegistryError, Result};

/// Lowest id any counter hands out
pub const DEFAULT_START_ID: i64 = 100;

/// Entity an id is allocated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    /// Product aggregate
    Product,
    /// Product code (NDC)
    Code,
    /// Source document file
    SourceFile,
    /// Product to adverse-event row
    ProductAdverseEvent,
    /// Product to indication row
    ProductIndication,
    /// Active ingredient
    Ingredient,
    /// External code reference (RxNorm concept or NDC)
    ExternalRef,
    /// Safety label change
    LabelChange,
}

impl IdKind {
    /// Every id kind
    pub const ALL: [IdKind; 8] = [
        IdKind::Product,
        IdKind::Code,
        IdKind::SourceFile,
        IdKind::ProductAdverseEvent,
        IdKind::ProductIndication,
        IdKind::Ingredient,
        IdKind::ExternalRef,
        IdKind::LabelChange,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Product => "product",
            IdKind::Code => "code",
            IdKind::SourceFile => "source_file",
            IdKind::ProductAdverseEvent => "product_adverse_event",
            IdKind::ProductIndication => "product_indication",
            IdKind::Ingredient => "ingredient",
            IdKind::ExternalRef => "external_ref",
            IdKind::LabelChange => "label_change",
        }
    }
}

/// Next id per kind, as found in existing output.
///
/// Missing entries start at [`DEFAULT_START_ID`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdStarts {
    /// Next product id
    #[serde(default)]
    pub product: Option<i64>,
    /// Next code id
    #[serde(default)]
    pub code: Option<i64>,
    /// Next source file id
    #[serde(default)]
    pub source_file: Option<i64>,
    /// Next product adverse-event id
    #[serde(default)]
    pub product_adverse_event: Option<i64>,
    /// Next product indication id
    #[serde(default)]
    pub product_indication: Option<i64>,
    /// Next ingredient id
    #[serde(default)]
    pub ingredient: Option<i64>,
    /// Next external reference id
    #[serde(default)]
    pub external_ref: Option<i64>,
    /// Next label change id
    #[serde(default)]
    pub label_change: Option<i64>,
}

impl IdStarts {
    /// Start value for a kind
    pub fn get(&self, kind: IdKind) -> Option<i64> {
        match kind {
            IdKind::Product => self.product,
            IdKind::Code => self.code,
            IdKind::SourceFile => self.source_file,
            IdKind::ProductAdverseEvent => self.product_adverse_event,
            IdKind::ProductIndication => self.product_indication,
            IdKind::Ingredient => self.ingredient,
            IdKind::ExternalRef => self.external_ref,
            IdKind::LabelChange => self.label_change,
        }
    }
}

/// One atomic counter per [`IdKind`].
///
/// Allocation is a single atomic add, so ids are unique across threads
/// without locking. Counters only move forward.
#[derive(Debug)]
pub struct IdAllocators {
    counters: [AtomicI64; 8],
    bootstrapped: AtomicBool,
}

impl IdAllocators {
    /// Counters starting at [`DEFAULT_START_ID`]
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicI64::new(DEFAULT_START_ID)),
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// Raise the counters to the given starts, at most once.
    ///
    /// Starts below [`DEFAULT_START_ID`] are clamped up to it.
    pub fn bootstrap(&self, starts: &IdStarts) -> Result<()> {
        if self
            .bootstrapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RegistryError::AlreadyBootstrapped);
        }
        for kind in IdKind::ALL {
            let start = starts.get(kind).unwrap_or(DEFAULT_START_ID).max(DEFAULT_START_ID);
            self.bump_to_at_least(kind, start);
        }
        info!(
            product = self.peek(IdKind::Product),
            code = self.peek(IdKind::Code),
            source_file = self.peek(IdKind::SourceFile),
            "Id counters bootstrapped"
        );
        Ok(())
    }

    /// Whether [`IdAllocators::bootstrap`] has run
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Acquire)
    }

    /// Allocate the next id
    pub fn next(&self, kind: IdKind) -> i64 {
        self.counters[kind.index()].fetch_add(1, Ordering::Relaxed)
    }

    /// Next id without allocating it
    pub fn peek(&self, kind: IdKind) -> i64 {
        self.counters[kind.index()].load(Ordering::Relaxed)
    }

    /// Ensure the next id is at least `next`; never lowers a counter
    pub fn bump_to_at_least(&self, kind: IdKind, next: i64) {
        self.counters[kind.index()].fetch_max(next, Ordering::Relaxed);
    }

    /// Allocate a product id
    pub fn next_product_id(&self) -> i64 {
        self.next(IdKind::Product)
    }

    /// Allocate a code id
    pub fn next_code_id(&self) -> i64 {
        self.next(IdKind::Code)
    }

    /// Allocate a source file id
    pub fn next_source_file_id(&self) -> i64 {
        self.next(IdKind::SourceFile)
    }

    /// Allocate a product adverse-event id
    pub fn next_product_adverse_event_id(&self) -> i64 {
        self.next(IdKind::ProductAdverseEvent)
    }

    /// Allocate a product indication id
    pub fn next_product_indication_id(&self) -> i64 {
        self.next(IdKind::ProductIndication)
    }
}

impl Default for IdAllocators {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_default_start() {
        let ids = IdAllocators::new();
        assert_eq!(ids.next_product_id(), 100);
        assert_eq!(ids.next_product_id(), 101);
        assert_eq!(ids.next_code_id(), 100);
    }

    #[test]
    fn test_bootstrap_once_and_clamped() {
        let ids = IdAllocators::new();
        let starts = IdStarts {
            product: Some(5_000),
            code: Some(3),
            ..IdStarts::default()
        };
        ids.bootstrap(&starts).unwrap();
        assert!(ids.is_bootstrapped());
        assert_eq!(ids.peek(IdKind::Product), 5_000);
        assert_eq!(ids.peek(IdKind::Code), DEFAULT_START_ID);
        assert_eq!(ids.peek(IdKind::SourceFile), DEFAULT_START_ID);

        assert_eq!(ids.bootstrap(&starts), Err(RegistryError::AlreadyBootstrapped));
    }

    #[test]
    fn test_bump_only_raises() {
        let ids = IdAllocators::new();
        ids.bump_to_at_least(IdKind::SourceFile, 700);
        ids.bump_to_at_least(IdKind::SourceFile, 200);
        assert_eq!(ids.next_source_file_id(), 700);
        assert_eq!(ids.peek(IdKind::SourceFile), 701);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let ids = Arc::new(IdAllocators::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..500).map(|_| ids.next_product_adverse_event_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4_000);
        assert_eq!(ids.peek(IdKind::ProductAdverseEvent), 4_100);
    }
}
