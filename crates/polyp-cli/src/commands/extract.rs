use crate::config::PolypConfig;
use crate::support::{extract_or_exit, print_json, suite_text_or_exit};
use serde_json::json;
use std::path::Path;

pub fn run(config: &PolypConfig, suite: &Path, json_output: bool) {
    let source = suite_text_or_exit(config, Some(suite));
    let extraction = extract_or_exit(config, &source);

    if json_output {
        let predicates: serde_json::Map<String, serde_json::Value> = extraction
            .predicates
            .iter()
            .map(|(module, fragments)| (module.to_string(), json!(fragments)))
            .collect();
        print_json(&json!({
            "suite": suite.display().to_string(),
            "version": config.core_js_version,
            "detection_prefix_bytes": extraction.detection_prefix.len(),
            "module_count": extraction.predicates.len(),
            "predicates": predicates,
        }));
    } else {
        println!("polyp extract {}", suite.display());
        println!("  Detection prefix: {} bytes", extraction.detection_prefix.len());
        println!("  Modules: {}", extraction.predicates.len());
        for (module, fragments) in extraction.predicates.iter() {
            println!("  - {module}: {} predicate(s)", fragments.len());
        }
    }
}
