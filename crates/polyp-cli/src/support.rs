use crate::config::{EmitKind, PolypConfig};
use polyp_compat::CompatCatalog;
use polyp_emit::{BundleEmitter, CommandEmitter, FsEmitter};
use polyp_kernel::{
    CheckMap, Partition, PredicateTable, SupportQuery, build_check_map, partition,
};
use polyp_source::{Origin, SuiteSource};
use polyp_suite::{AdapterRegistry, CoreJsTestsAdapter, Extraction};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process;
use tracing::info;

pub fn load_config_or_exit(path: Option<&Path>) -> PolypConfig {
    PolypConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn load_catalog_or_exit(config: &PolypConfig) -> CompatCatalog {
    CompatCatalog::load_dir(&config.catalog_dir).unwrap_or_else(|e| {
        eprintln!(
            "error: failed to load compat catalog from {}: {e}",
            config.catalog_dir.display()
        );
        process::exit(1);
    })
}

pub fn partition_or_exit(config: &PolypConfig, catalog: &CompatCatalog) -> Partition {
    let broad = SupportQuery::entry(config.partition.stable_entry.clone());
    let modern = SupportQuery::targets(
        config.queries.modern.label.clone(),
        config.queries.modern.targets.clone(),
    );
    let result = partition(catalog, &broad, &modern, &config.partition.policy())
        .unwrap_or_else(|e| {
            eprintln!("error: partition failed: {e}");
            process::exit(1);
        });
    info!(
        target: "polyp::cli",
        stable = result.stable.len(),
        modern = result.modern.len(),
        legacy = result.legacy.len(),
        "partitioned modules"
    );
    result
}

pub fn suite_source_or_exit(config: &PolypConfig) -> SuiteSource {
    SuiteSource::new(
        &config.suite_url_template,
        &config.core_js_version,
        &config.cache_dir,
    )
    .unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

/// Test-suite text: a local file when given, otherwise the cached or
/// freshly fetched upstream file.
pub fn suite_text_or_exit(config: &PolypConfig, local: Option<&Path>) -> String {
    if let Some(path) = local {
        return fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("error: failed to read {}: {e}", path.display());
            process::exit(1);
        });
    }

    let source = suite_source_or_exit(config);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
    let acquired = runtime.block_on(source.acquire()).unwrap_or_else(|e| {
        eprintln!("error: failed to acquire test suite: {e}");
        process::exit(1);
    });
    let origin = match acquired.origin {
        Origin::Cache => "cache",
        Origin::Network => "network",
    };
    info!(target: "polyp::cli", url = source.url(), origin, "acquired test suite");
    acquired.text
}

pub fn extract_or_exit(config: &PolypConfig, source: &str) -> Extraction {
    let mut registry = AdapterRegistry::empty();
    registry.register(CoreJsTestsAdapter::default().with_rewrites(config.rewrites.clone()));
    registry
        .extract(source, &config.core_js_version)
        .unwrap_or_else(|e| {
            eprintln!("error: test suite extraction failed: {e}");
            process::exit(1);
        })
}

pub fn check_map(table: &PredicateTable, partition: &Partition) -> CheckMap {
    build_check_map(table, &partition.stable)
}

pub fn emitter_or_exit(config: &PolypConfig) -> Box<dyn BundleEmitter> {
    match config.emit.kind {
        EmitKind::Fs => Box::new(FsEmitter),
        EmitKind::Command => {
            let Some(program) = config.emit.program.clone() else {
                eprintln!("error: [emit] kind = \"command\" requires `program`");
                process::exit(1);
            };
            Box::new(CommandEmitter::new(program, config.emit.args.clone()))
        }
    }
}

pub fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization")
    );
}

pub fn module_list(modules: &[polyp_kernel::ModuleId]) -> String {
    if modules.is_empty() {
        return "(none)".to_string();
    }
    modules
        .iter()
        .map(|module| module.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
