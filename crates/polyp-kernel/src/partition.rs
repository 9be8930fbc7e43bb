//! Compatibility partitioning: stable / modern / legacy.
//!
//! The broad query yields every candidate module. Candidates that no
//! tracked environment family has ever shipped are data-only entries and
//! are dropped, unless pinned. The modern query, intersected with the
//! survivors, is the modern tier; the rest is legacy.

use crate::compat::{CompatibilityProvider, SupportQuery};
use crate::error::KernelError;
use crate::module::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// One of the two loadable tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Modern,
    Legacy,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Modern => f.write_str("modern"),
            Tier::Legacy => f.write_str("legacy"),
        }
    }
}

/// Filtering rules applied to the broad query's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PartitionPolicy {
    /// Environment families whose support data counts as "shipped".
    pub tracked_families: Vec<String>,

    /// Always kept, whatever the support data says.
    #[serde(default)]
    pub pinned_required: BTreeSet<ModuleId>,

    /// Always dropped, whatever the support data says.
    #[serde(default)]
    pub pinned_irrelevant: BTreeSet<ModuleId>,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        Self {
            tracked_families: [
                "chrome",
                "firefox",
                "safari",
                "edge",
                "ios",
                "chrome-android",
                "firefox-android",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            // Support data claims no browser ships it, but the polyfill
            // is still wanted.
            pinned_required: BTreeSet::from([ModuleId::new("web.structured-clone")]),
            // The only module that makes current Chrome need a polyfill.
            pinned_irrelevant: BTreeSet::from([ModuleId::new("web.dom-exception.stack")]),
        }
    }
}

impl PartitionPolicy {
    fn keeps(&self, module: &ModuleId, provider: &dyn CompatibilityProvider) -> Result<(), &'static str> {
        if self.pinned_required.contains(module) {
            return Ok(());
        }
        if self.pinned_irrelevant.contains(module) {
            return Err("pinned irrelevant");
        }
        match provider.record(module) {
            Some(record) if record.shipped_by_any(&self.tracked_families) => Ok(()),
            Some(_) => Err("no tracked environment ships it"),
            None => Err("no compatibility record"),
        }
    }
}

/// The three module sets. `modern ∪ legacy = stable`, `modern ∩ legacy = ∅`.
///
/// All three lists keep the provider's canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub stable: Vec<ModuleId>,
    pub modern: Vec<ModuleId>,
    pub legacy: Vec<ModuleId>,
}

impl Partition {
    pub fn tier(&self, tier: Tier) -> &[ModuleId] {
        match tier {
            Tier::Modern => &self.modern,
            Tier::Legacy => &self.legacy,
        }
    }

    /// Which tier a module landed in, if any.
    pub fn tier_of(&self, module: &ModuleId) -> Option<Tier> {
        if self.modern.contains(module) {
            Some(Tier::Modern)
        } else if self.legacy.contains(module) {
            Some(Tier::Legacy)
        } else {
            None
        }
    }

    /// Check disjointness and coverage of the tiers.
    pub fn verify(&self) -> Result<(), KernelError> {
        let stable: BTreeSet<&ModuleId> = self.stable.iter().collect();
        let modern: BTreeSet<&ModuleId> = self.modern.iter().collect();
        for module in &self.legacy {
            if modern.contains(module) {
                return Err(KernelError::TierOverlap(module.clone()));
            }
        }
        for module in self.modern.iter().chain(&self.legacy) {
            if !stable.contains(module) {
                return Err(KernelError::TierEscape(module.clone()));
            }
        }
        if let Some(missing) = self.stable.iter().find(|m| self.tier_of(m).is_none()) {
            return Err(KernelError::TierEscape(missing.clone()));
        }
        Ok(())
    }
}

/// Partition the modules of `broad` into modern and legacy tiers.
pub fn partition(
    provider: &dyn CompatibilityProvider,
    broad: &SupportQuery,
    modern: &SupportQuery,
    policy: &PartitionPolicy,
) -> Result<Partition, KernelError> {
    let candidates = provider.evaluate(broad)?;
    let mut stable = Vec::with_capacity(candidates.len());
    let mut seen = BTreeSet::new();
    for module in candidates {
        if !seen.insert(module.clone()) {
            continue;
        }
        match policy.keeps(&module, provider) {
            Ok(()) => stable.push(module),
            Err(reason) => {
                warn!(target: "polyp::partition", module = %module, reason, "skipping module");
            }
        }
    }

    let stable_set: BTreeSet<&ModuleId> = stable.iter().collect();
    let mut modern_set = BTreeSet::new();
    let mut modern_tier = Vec::new();
    for module in provider.evaluate(modern)? {
        if stable_set.contains(&module) && modern_set.insert(module.clone()) {
            modern_tier.push(module);
        }
    }
    let legacy = stable
        .iter()
        .filter(|module| !modern_set.contains(*module))
        .cloned()
        .collect::<Vec<_>>();

    debug!(
        target: "polyp::partition",
        stable = stable.len(),
        modern = modern_tier.len(),
        legacy = legacy.len(),
        "partitioned modules"
    );

    Ok(Partition {
        stable,
        modern: modern_tier,
        legacy,
    })
}
