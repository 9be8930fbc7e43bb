use crate::config::PolypConfig;
use crate::support::{load_catalog_or_exit, module_list, partition_or_exit, print_json};
use serde_json::json;

pub fn run(config: &PolypConfig, json_output: bool) {
    let catalog = load_catalog_or_exit(config);
    let result = partition_or_exit(config, &catalog);

    if json_output {
        print_json(&json!({
            "stable_entry": config.partition.stable_entry,
            "modern_query": config.queries.modern.label,
            "stable": result.stable,
            "modern": result.modern,
            "legacy": result.legacy,
        }));
    } else {
        println!("polyp partition {}", config.partition.stable_entry);
        println!("  Catalog: {}", config.catalog_dir.display());
        println!("  Stable ({}): {}", result.stable.len(), module_list(&result.stable));
        println!("  Modern ({}): {}", result.modern.len(), module_list(&result.modern));
        println!("  Legacy ({}): {}", result.legacy.len(), module_list(&result.legacy));
    }
}
