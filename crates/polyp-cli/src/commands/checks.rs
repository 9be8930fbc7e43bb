use crate::config::PolypConfig;
use crate::support::{
    check_map, extract_or_exit, load_catalog_or_exit, partition_or_exit, print_json,
    suite_text_or_exit,
};
use polyp_kernel::{Tier, TierChecks};
use serde_json::{Value, json};
use std::path::Path;

pub fn run(config: &PolypConfig, suite: Option<&Path>, json_output: bool) {
    let catalog = load_catalog_or_exit(config);
    let result = partition_or_exit(config, &catalog);
    let source = suite_text_or_exit(config, suite);
    let extraction = extract_or_exit(config, &source);
    let checks = check_map(&extraction.predicates, &result);

    let tiers = [
        checks.tier(&result, Tier::Modern),
        checks.tier(&result, Tier::Legacy),
    ];

    if json_output {
        let payload: serde_json::Map<String, Value> = tiers
            .iter()
            .map(|tier| (tier.tier.to_string(), tier_json(tier)))
            .collect();
        print_json(&payload);
    } else {
        println!("polyp checks");
        for tier in &tiers {
            let merged = tier.merged();
            println!(
                "  {} ({} modules, {} distinct predicates)",
                tier.tier,
                tier.entries.len(),
                merged.len()
            );
            for (module, predicates) in &tier.entries {
                let note = if predicates.is_empty() {
                    " (unchecked: tier always loads)"
                } else {
                    ""
                };
                println!("    - {module}: {}{note}", predicates.len());
            }
        }
    }
}

fn tier_json(tier: &TierChecks) -> Value {
    let modules: serde_json::Map<String, Value> = tier
        .entries
        .iter()
        .map(|(module, predicates)| (module.to_string(), json!(predicates)))
        .collect();
    let unchecked: Vec<String> = tier.unchecked().map(ToString::to_string).collect();
    json!({
        "modules": modules,
        "unchecked": unchecked,
        "merged_predicate_count": tier.merged().len(),
    })
}
