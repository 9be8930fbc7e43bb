//! Check-map resolution.
//!
//! A module with authored predicates uses them. A module without any
//! falls back to the predicates of its dotted descendants, in the
//! predicate table's encounter order. A module that resolves to nothing
//! is unchecked and always counts as needing its polyfill.

use crate::module::{ModuleId, SourceFragment};
use crate::partition::{Partition, Tier};
use crate::predicates::PredicateTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Resolved predicates for every stable module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckMap(BTreeMap<ModuleId, Vec<SourceFragment>>);

impl CheckMap {
    pub fn get(&self, module: &ModuleId) -> Option<&[SourceFragment]> {
        self.0.get(module).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The resolved predicates of one tier's modules, in tier order.
    ///
    /// Modules absent from the map resolve to an empty list.
    pub fn tier(&self, partition: &Partition, tier: Tier) -> TierChecks {
        let entries = partition
            .tier(tier)
            .iter()
            .map(|module| {
                let predicates = self.0.get(module).cloned().unwrap_or_default();
                (module.clone(), predicates)
            })
            .collect();
        TierChecks { tier, entries }
    }
}

/// Resolve the predicate list of a single module.
pub fn resolve_module(table: &PredicateTable, module: &ModuleId) -> Vec<SourceFragment> {
    if let Some(direct) = table.get(module) {
        return direct.to_vec();
    }
    table
        .iter()
        .filter(|(key, _)| key.descends_from(module))
        .flat_map(|(_, predicates)| predicates.iter().cloned())
        .collect()
}

/// Build the check-map for `modules` (normally the stable set).
pub fn build_check_map(table: &PredicateTable, modules: &[ModuleId]) -> CheckMap {
    let mut map = BTreeMap::new();
    for module in modules {
        let resolved = resolve_module(table, module);
        if resolved.is_empty() {
            debug!(target: "polyp::check_map", module = %module, "module has no predicates");
        }
        map.insert(module.clone(), resolved);
    }
    CheckMap(map)
}

/// Collapse textually identical predicates, keeping first occurrences.
pub fn merge_predicates<'a>(
    lists: impl IntoIterator<Item = &'a [SourceFragment]>,
) -> Vec<SourceFragment> {
    let mut seen = BTreeSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for predicate in list {
            if seen.insert(predicate.as_str()) {
                merged.push(predicate.clone());
            }
        }
    }
    merged
}

/// Resolved predicates of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChecks {
    pub tier: Tier,
    pub entries: Vec<(ModuleId, Vec<SourceFragment>)>,
}

impl TierChecks {
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.entries.iter().map(|(module, _)| module)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Modules with no predicates at all.
    pub fn unchecked(&self) -> impl Iterator<Item = &ModuleId> {
        self.entries
            .iter()
            .filter(|(_, predicates)| predicates.is_empty())
            .map(|(module, _)| module)
    }

    /// The de-duplicated predicate list gating this tier.
    pub fn merged(&self) -> Vec<SourceFragment> {
        merge_predicates(self.entries.iter().map(|(_, predicates)| predicates.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(s: &str) -> SourceFragment {
        SourceFragment::new(s)
    }

    fn table(entries: &[(&str, &[&str])]) -> PredicateTable {
        entries
            .iter()
            .map(|(module, predicates)| {
                (
                    ModuleId::new(*module),
                    predicates.iter().map(|p| frag(p)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn direct_entry_wins_over_descendants() {
        let table = table(&[("foo", &["direct"]), ("foo.bar", &["child"])]);
        assert_eq!(resolve_module(&table, &ModuleId::new("foo")), vec![frag("direct")]);
    }

    #[test]
    fn sub_module_fallback_concatenates_in_encounter_order() {
        let table = table(&[
            ("foo.baz", &["baz1", "shared"]),
            ("other", &["x"]),
            ("foo.bar", &["bar1", "shared"]),
            ("foobar", &["not a child"]),
        ]);
        let resolved = resolve_module(&table, &ModuleId::new("foo"));
        assert_eq!(
            resolved,
            vec![frag("baz1"), frag("shared"), frag("bar1"), frag("shared")]
        );
        assert_eq!(
            merge_predicates([resolved.as_slice()]),
            vec![frag("baz1"), frag("shared"), frag("bar1")]
        );
    }

    #[test]
    fn unknown_module_resolves_to_empty_and_is_unchecked() {
        let table = table(&[("a", &["pa"])]);
        let partition = Partition {
            stable: vec![ModuleId::new("a"), ModuleId::new("b")],
            modern: vec![ModuleId::new("a"), ModuleId::new("b")],
            legacy: vec![],
        };
        let map = build_check_map(&table, &partition.stable);
        let modern = map.tier(&partition, Tier::Modern);
        let unchecked: Vec<&ModuleId> = modern.unchecked().collect();
        assert_eq!(unchecked, vec![&ModuleId::new("b")]);
        assert_eq!(modern.merged(), vec![frag("pa")]);
    }

    #[test]
    fn tier_merge_deduplicates_across_modules() {
        let table = table(&[("a", &["p1", "p2"]), ("b", &["p2", "p3"])]);
        let partition = Partition {
            stable: vec![ModuleId::new("a"), ModuleId::new("b")],
            modern: vec![],
            legacy: vec![ModuleId::new("a"), ModuleId::new("b")],
        };
        let map = build_check_map(&table, &partition.stable);
        assert_eq!(
            map.tier(&partition, Tier::Legacy).merged(),
            vec![frag("p1"), frag("p2"), frag("p3")]
        );
    }
}
