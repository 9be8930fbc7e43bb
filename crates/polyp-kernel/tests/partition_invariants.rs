//! Partition and cascade invariants over an enumerated family of inputs.
//!
//! Every subset choice of a small module universe is tried as both the
//! broad and the modern query result; the tiers must stay disjoint,
//! cover the stable set, and the generated cascade must import each
//! stable module exactly once.

use polyp_kernel::{
    CascadeOptions, CompatRecord, CompatibilityProvider, KernelError, ModuleId, PartitionPolicy,
    PredicateTable, SourceFragment, SupportQuery, TargetSet, build_check_map, generate_cascade,
    partition,
};
use std::collections::{BTreeMap, BTreeSet};

const UNIVERSE: [&str; 5] = ["es.a", "es.a.b", "es.c", "web.d", "web.e"];

struct MaskProvider {
    broad: u32,
    modern: u32,
    records: BTreeMap<ModuleId, CompatRecord>,
}

fn select(mask: u32) -> Vec<ModuleId> {
    UNIVERSE
        .iter()
        .enumerate()
        .filter(|(idx, _)| mask & (1 << idx) != 0)
        .map(|(_, name)| ModuleId::new(*name))
        .collect()
}

impl CompatibilityProvider for MaskProvider {
    fn evaluate(&self, query: &SupportQuery) -> Result<Vec<ModuleId>, KernelError> {
        Ok(if query.targets.is_some() {
            select(self.modern)
        } else {
            select(self.broad)
        })
    }

    fn record(&self, module: &ModuleId) -> Option<&CompatRecord> {
        self.records.get(module)
    }
}

fn records() -> BTreeMap<ModuleId, CompatRecord> {
    UNIVERSE
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let mut map = BTreeMap::new();
            // Every third module is only shipped by an untracked family.
            let family = if idx % 3 == 2 { "deno" } else { "chrome" };
            map.insert(family.to_string(), "10".parse().expect("version"));
            (ModuleId::new(*name), CompatRecord(map))
        })
        .collect()
}

fn predicates() -> PredicateTable {
    [
        ("es.a.b", vec!["ab()", "shared()"]),
        ("es.c", vec!["shared()"]),
        ("web.d", vec!["d()"]),
        ("web.e", vec!["e()"]),
    ]
    .into_iter()
    .map(|(module, list)| {
        (
            ModuleId::new(module),
            list.into_iter().map(SourceFragment::new).collect(),
        )
    })
    .collect()
}

#[test]
fn tiers_are_disjoint_and_cover_stable_for_all_query_results() {
    let policy = PartitionPolicy {
        tracked_families: vec!["chrome".to_string()],
        pinned_required: BTreeSet::new(),
        pinned_irrelevant: BTreeSet::new(),
    };
    let broad_query = SupportQuery::entry("core-js/stable");
    let modern_query = SupportQuery::targets("modern", TargetSet::default());
    let table = predicates();

    for broad in 0..(1u32 << UNIVERSE.len()) {
        for modern in 0..(1u32 << UNIVERSE.len()) {
            let provider = MaskProvider {
                broad,
                modern,
                records: records(),
            };
            let result = partition(&provider, &broad_query, &modern_query, &policy)
                .expect("partition should succeed");

            let modern_set: BTreeSet<_> = result.modern.iter().collect();
            let legacy_set: BTreeSet<_> = result.legacy.iter().collect();
            let stable_set: BTreeSet<_> = result.stable.iter().collect();
            assert!(modern_set.is_disjoint(&legacy_set), "{broad:b}/{modern:b}");
            let union: BTreeSet<_> = modern_set.union(&legacy_set).copied().collect();
            assert_eq!(union, stable_set, "{broad:b}/{modern:b}");

            let checks = build_check_map(&table, &result.stable);
            let cascade = generate_cascade(&result, &checks, "", &CascadeOptions::default())
                .expect("cascade should generate");
            let imported: Vec<&ModuleId> = cascade
                .fragments
                .iter()
                .flat_map(|fragment| fragment.imports.iter())
                .collect();
            assert_eq!(imported.len(), result.stable.len());
        }
    }
}

#[test]
fn parent_module_without_predicates_inherits_children() {
    let checks = build_check_map(&predicates(), &[ModuleId::new("es.a")]);
    let resolved: Vec<&str> = checks
        .get(&ModuleId::new("es.a"))
        .expect("resolved entry")
        .iter()
        .map(SourceFragment::as_str)
        .collect();
    assert_eq!(resolved, vec!["ab()", "shared()"]);
}
