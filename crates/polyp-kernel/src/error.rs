//! Error types for kernel operations.

use crate::module::ModuleId;

/// Errors arising from kernel invariants or provider failures.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The compatibility provider could not answer a query.
    #[error("compatibility query `{query}` failed: {message}")]
    Provider { query: String, message: String },

    /// A module landed in both the modern and legacy tier.
    #[error("tier overlap: module `{0}` is in both modern and legacy")]
    TierOverlap(ModuleId),

    /// A tier module is missing from the stable set.
    #[error("tier escape: module `{0}` is not part of the stable set")]
    TierEscape(ModuleId),

    /// A generated fragment imports a module more than once, or imports
    /// a module outside its tier.
    #[error("cascade violation in {fragment}: {description}")]
    Cascade {
        fragment: String,
        description: String,
    },
}
