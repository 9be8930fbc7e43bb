use crate::config::PolypConfig;
use crate::support::{print_json, suite_source_or_exit};
use serde_json::json;

pub fn run(config: &PolypConfig, json_output: bool) {
    let source = suite_source_or_exit(config);
    let path = source.cache_path();

    if json_output {
        print_json(&json!({
            "url": source.url(),
            "cache_path": path.display().to_string(),
            "cached": path.is_file(),
        }));
    } else {
        println!("{}", path.display());
    }
}
