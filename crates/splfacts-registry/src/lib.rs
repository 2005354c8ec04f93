//! splfacts Registry
//!
//! Identity and dedup state shared by the extraction workers of one run.
//!
//! # Overview
//!
//! - [`IdAllocators`]: one monotonic counter per entity type. Counters are
//!   bootstrapped once from the ids already in existing output and never
//!   move backwards.
//! - [`IdentityRegistry`]: natural key → id maps with first-writer-wins
//!   insert-if-absent, a "written" set, and per-section pass counters.
//!   Namespaces cover products, product codes, source files, ingredients,
//!   RxNorm concepts, NDCs and safety label changes.
//!
//! Every operation is a single atomic op or a single map entry operation,
//! so the registry is shared through `Arc` without an outer lock.
//!
//! # Example
//!
//! ```
//! use splfacts_registry::{composite_key, IdKind, IdStarts, IdentityRegistry, KeyKind};
//!
//! let registry = IdentityRegistry::new();
//! registry.ids().bootstrap(&IdStarts { product: Some(2_000), ..IdStarts::default() }).unwrap();
//! assert_eq!(registry.ids().next_product_id(), 2_000);
//!
//! let key = composite_key(&["0002-3227", "Taxol"]);
//! let (id, fresh) = registry.get_or_allocate(KeyKind::Code, &key, IdKind::Code);
//! assert!(fresh);
//! assert_eq!(registry.get_or_allocate(KeyKind::Code, &key, IdKind::Code), (id, false));
//! ```

#![warn(missing_docs)]

mod error;
mod ids;
mod registry;

pub use error::{RegistryError, Result};
pub use ids::{IdAllocators, IdKind, IdStarts, DEFAULT_START_ID};
pub use registry::{composite_key, IdentityRegistry, KeyKind, RegistryStats, KEY_SEPARATOR};
