//! # polyp kernel
//!
//! Decides which polyfill modules a modern environment needs versus a
//! legacy one, which runtime predicates gate each tier, and emits the
//! cascading loader that checks those predicates at runtime.
//!
//! The kernel is **catalog-agnostic**: it does not know how support
//! queries are resolved or how a test suite is parsed. Both arrive
//! through narrow seams (`CompatibilityProvider`, `PredicateTable`).
//!
//! ## Pipeline
//!
//! ```text
//! CompatibilityProvider  ← external support data, queried twice
//!     │
//! Partition              ← stable / modern / legacy module sets
//!     │
//! CheckMap               ← module → resolved predicates (needs PredicateTable)
//!     │
//! Cascade                ← index.js ⇒ modern.js ⇒ legacy.js
//!     │
//! VirtualInputs          ← handed to an external bundle emitter
//! ```

pub mod cascade;
pub mod check_map;
pub mod compat;
pub mod digest;
pub mod error;
pub mod module;
pub mod partition;
pub mod predicates;

pub use cascade::{
    Cascade, CascadeOptions, ENTRY_FRAGMENT, Fragment, Gate, LEGACY_FRAGMENT, MODERN_FRAGMENT,
    VirtualInputs, generate_cascade,
};
pub use check_map::{CheckMap, TierChecks, build_check_map, merge_predicates, resolve_module};
pub use compat::{CompatRecord, CompatibilityProvider, SupportQuery, TargetSet, Version};
pub use digest::{BuildDigest, ContentHash};
pub use error::KernelError;
pub use module::{ModuleId, SourceFragment};
pub use partition::{Partition, PartitionPolicy, Tier, partition};
pub use predicates::PredicateTable;
