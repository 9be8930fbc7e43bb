use crate::config::PolypConfig;
use crate::support::{
    check_map, emitter_or_exit, extract_or_exit, load_catalog_or_exit, module_list,
    partition_or_exit, print_json, suite_text_or_exit,
};
use polyp_kernel::{BuildDigest, Gate, generate_cascade};
use serde_json::json;
use std::path::Path;
use std::process;
use tracing::info;

pub fn run(config: &PolypConfig, suite: Option<&Path>, out: Option<&Path>, json_output: bool) {
    let out_dir = out.unwrap_or(&config.out_dir);

    let catalog = load_catalog_or_exit(config);
    let result = partition_or_exit(config, &catalog);
    let source = suite_text_or_exit(config, suite);
    let extraction = extract_or_exit(config, &source);
    let checks = check_map(&extraction.predicates, &result);

    let cascade = generate_cascade(
        &result,
        &checks,
        &extraction.detection_prefix,
        &config.cascade_options(),
    )
    .and_then(|cascade| cascade.verify(&result).map(|()| cascade))
    .unwrap_or_else(|e| {
        eprintln!("error: cascade generation failed: {e}");
        process::exit(1);
    });

    let inputs = cascade.to_virtual_inputs();
    let digest = BuildDigest::of(&inputs);
    info!(target: "polyp::cli", %digest, "generated cascade");

    let emitter = emitter_or_exit(config);
    let report = emitter.emit(&inputs, out_dir).unwrap_or_else(|e| {
        eprintln!("error: emit failed: {e}");
        process::exit(1);
    });

    if json_output {
        let fragments: Vec<_> = cascade
            .fragments
            .iter()
            .map(|fragment| {
                json!({
                    "name": fragment.name,
                    "tier": fragment.tier,
                    "imports": fragment.imports,
                    "gate": fragment.gate,
                })
            })
            .collect();
        print_json(&json!({
            "build_digest": digest,
            "core_js_version": config.core_js_version,
            "stable": result.stable.len(),
            "modern": result.modern,
            "legacy": result.legacy,
            "fragments": fragments,
            "emit": report,
        }));
    } else {
        println!("polyp build {digest}");
        println!("  Modern ({}): {}", result.modern.len(), module_list(&result.modern));
        println!("  Legacy ({}): {}", result.legacy.len(), module_list(&result.legacy));
        for fragment in &cascade.fragments {
            let gate = match &fragment.gate {
                Gate::Terminal => "terminal".to_string(),
                Gate::Resolved => "resolves immediately".to_string(),
                Gate::Always { target } => format!("always loads {target}"),
                Gate::Check { target, predicates } => {
                    format!("loads {target} unless {} predicate(s) pass", predicates.len())
                }
            };
            println!(
                "  {}: {} import(s), {gate}",
                fragment.name,
                fragment.imports.len()
            );
        }
        println!("  Emitted ({}) to {}:", report.emitter, report.out_dir.display());
        for file in &report.files {
            println!("    {} {} bytes sha256:{}", file.name, file.bytes, file.sha256.short(16));
        }
    }
}
