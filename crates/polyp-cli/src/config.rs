//! `polyp.toml`.
//!
//! Every key is optional; the defaults reproduce the stock core-js build.

use polyp_kernel::{CascadeOptions, ModuleId, PartitionPolicy, TargetSet};
use polyp_source::{DEFAULT_CACHE_DIR, DEFAULT_URL_TEMPLATE};
use polyp_suite::{HARNESS_CHANNEL, Rewrite};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "polyp.toml";

const DEFAULT_CORE_JS_VERSION: &str = "3.38.1";
const DEFAULT_CATALOG_DIR: &str = "node_modules/core-js-compat";
const DEFAULT_OUT_DIR: &str = "dist";
const DEFAULT_STABLE_ENTRY: &str = "core-js/stable";

const DEFAULT_MODERN_LABEL: &str = "last 4 years and not dead and not chrome > 0 and not opera > 0 \
    and not firefox > 0 and not samsung > 0 and not and_chr > 0 and not and_ff > 0 \
    and not edge > 0, last 5 chrome versions, last 5 opera versions, last 5 firefox versions, \
    last 5 samsung versions, last 5 and_chr versions, last 5 and_ff versions, \
    last 5 edge versions, firefox esr";

/// Resolution of `DEFAULT_MODERN_LABEL`, oldest version per family.
const DEFAULT_MODERN_TARGETS: &[(&str, &str)] = &[
    ("chrome", "125"),
    ("chrome-android", "125"),
    ("edge", "125"),
    ("firefox", "115"),
    ("firefox-android", "126"),
    ("ios", "14.5"),
    ("opera", "111"),
    ("safari", "14.1"),
    ("samsung", "22"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolypConfig {
    pub core_js_version: String,
    pub suite_url_template: String,
    pub cache_dir: PathBuf,
    pub out_dir: PathBuf,
    pub catalog_dir: PathBuf,
    pub module_prefix: String,
    pub global_import: String,
    pub partition: PartitionConfig,
    pub queries: QueriesConfig,
    pub rewrites: Vec<Rewrite>,
    pub emit: EmitConfig,
}

impl Default for PolypConfig {
    fn default() -> Self {
        let cascade = CascadeOptions::default();
        Self {
            core_js_version: DEFAULT_CORE_JS_VERSION.to_string(),
            suite_url_template: DEFAULT_URL_TEMPLATE.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            catalog_dir: PathBuf::from(DEFAULT_CATALOG_DIR),
            module_prefix: cascade.module_prefix,
            global_import: cascade.global_import,
            partition: PartitionConfig::default(),
            queries: QueriesConfig::default(),
            rewrites: Rewrite::structured_clone_defaults(),
            emit: EmitConfig::default(),
        }
    }
}

impl PolypConfig {
    /// Load from `path`. An absent file is an error only when the path was
    /// given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::parse(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn cascade_options(&self) -> CascadeOptions {
        CascadeOptions {
            module_prefix: self.module_prefix.clone(),
            global_import: self.global_import.clone(),
            harness_channel: HARNESS_CHANNEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartitionConfig {
    /// Catalog entry whose modules form the broad query.
    pub stable_entry: String,
    pub tracked_families: Vec<String>,
    pub pinned_required: BTreeSet<ModuleId>,
    pub pinned_irrelevant: BTreeSet<ModuleId>,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        let policy = PartitionPolicy::default();
        Self {
            stable_entry: DEFAULT_STABLE_ENTRY.to_string(),
            tracked_families: policy.tracked_families,
            pinned_required: policy.pinned_required,
            pinned_irrelevant: policy.pinned_irrelevant,
        }
    }
}

impl PartitionConfig {
    pub fn policy(&self) -> PartitionPolicy {
        PartitionPolicy {
            tracked_families: self.tracked_families.clone(),
            pinned_required: self.pinned_required.clone(),
            pinned_irrelevant: self.pinned_irrelevant.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueriesConfig {
    pub modern: ModernQuery,
}

/// The environments the modern tier is built for. `label` documents the
/// browserslist query; `targets` is its resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModernQuery {
    pub label: String,
    pub targets: TargetSet,
}

impl Default for ModernQuery {
    fn default() -> Self {
        let targets: BTreeMap<String, _> = DEFAULT_MODERN_TARGETS
            .iter()
            .filter_map(|(family, version)| {
                version.parse().ok().map(|v| (family.to_string(), v))
            })
            .collect();
        Self {
            label: DEFAULT_MODERN_LABEL.to_string(),
            targets: TargetSet(targets),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitKind {
    #[default]
    Fs,
    Command,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    pub kind: EmitKind,
    /// Bundler executable, for `kind = "command"`.
    pub program: Option<String>,
    pub args: Vec<String>,
}
