//! # polyp-compat
//!
//! A [`CompatibilityProvider`] over the data files core-js-compat ships:
//!
//! ```text
//! data.json     module → { env family → first native version }
//! modules.json  [module, …]                 canonical module order
//! entries.json  entry name → [module, …]    optional
//! ```
//!
//! Resolving a browserslist expression into concrete targets is not done
//! here; queries arrive with their targets already resolved.

use polyp_kernel::{CompatRecord, CompatibilityProvider, KernelError, ModuleId, SupportQuery};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DATA_FILE: &str = "data.json";
pub const MODULES_FILE: &str = "modules.json";
pub const ENTRIES_FILE: &str = "entries.json";

/// Errors from loading or querying a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json at {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown entry `{0}`")]
    UnknownEntry(String),

    #[error("module `{module}` listed in {file} has no support record")]
    MissingRecord { module: ModuleId, file: String },
}

/// In-memory compatibility catalog.
#[derive(Debug, Clone, Default)]
pub struct CompatCatalog {
    order: Vec<ModuleId>,
    data: BTreeMap<ModuleId, CompatRecord>,
    entries: BTreeMap<String, Vec<ModuleId>>,
}

impl CompatCatalog {
    /// Build a catalog from parts. Modules present in `data` but missing
    /// from `order` are appended in lexical order.
    pub fn new(
        order: Vec<ModuleId>,
        data: BTreeMap<ModuleId, CompatRecord>,
        entries: BTreeMap<String, Vec<ModuleId>>,
    ) -> Result<Self, CompatError> {
        for module in &order {
            if !data.contains_key(module) {
                return Err(CompatError::MissingRecord {
                    module: module.clone(),
                    file: MODULES_FILE.to_string(),
                });
            }
        }
        let listed: BTreeSet<&ModuleId> = order.iter().collect();
        let unlisted: Vec<ModuleId> = data
            .keys()
            .filter(|module| !listed.contains(module))
            .cloned()
            .collect();
        let mut order = order;
        order.extend(unlisted);
        Ok(Self {
            order,
            data,
            entries,
        })
    }

    /// Load `data.json`, `modules.json` and (if present) `entries.json`
    /// from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, CompatError> {
        let dir = dir.as_ref();
        let data: BTreeMap<ModuleId, CompatRecord> = read_json(&dir.join(DATA_FILE))?;
        let modules_path = dir.join(MODULES_FILE);
        let order: Vec<ModuleId> = if modules_path.exists() {
            read_json(&modules_path)?
        } else {
            Vec::new()
        };
        let entries_path = dir.join(ENTRIES_FILE);
        let entries: BTreeMap<String, Vec<ModuleId>> = if entries_path.exists() {
            read_json(&entries_path)?
        } else {
            BTreeMap::new()
        };
        let catalog = Self::new(order, data, entries)?;
        debug!(
            target: "polyp::compat",
            dir = %dir.display(),
            modules = catalog.order.len(),
            entries = catalog.entries.len(),
            "loaded compatibility catalog"
        );
        Ok(catalog)
    }

    /// Modules in canonical order.
    pub fn modules(&self) -> &[ModuleId] {
        &self.order
    }

    /// Modules of one entry point, in canonical order.
    pub fn entry_modules(&self, entry: &str) -> Result<Vec<ModuleId>, CompatError> {
        let listed: BTreeSet<&ModuleId> = self
            .entries
            .get(entry)
            .ok_or_else(|| CompatError::UnknownEntry(entry.to_string()))?
            .iter()
            .collect();
        Ok(self
            .order
            .iter()
            .filter(|module| listed.contains(module))
            .cloned()
            .collect())
    }

    fn needed(&self, module: &ModuleId, query: &SupportQuery) -> bool {
        let Some(targets) = &query.targets else {
            return true;
        };
        let Some(record) = self.data.get(module) else {
            return true;
        };
        targets
            .iter()
            .any(|(family, version)| record.needed_by(family, version))
    }
}

impl CompatibilityProvider for CompatCatalog {
    fn evaluate(&self, query: &SupportQuery) -> Result<Vec<ModuleId>, KernelError> {
        let candidates = match &query.entry {
            Some(entry) => self.entry_modules(entry).map_err(|e| KernelError::Provider {
                query: query.label.clone(),
                message: e.to_string(),
            })?,
            None => self.order.clone(),
        };
        let selected: Vec<ModuleId> = candidates
            .into_iter()
            .filter(|module| self.needed(module, query))
            .collect();
        debug!(
            target: "polyp::compat",
            query = %query.label,
            selected = selected.len(),
            "evaluated support query"
        );
        Ok(selected)
    }

    fn record(&self, module: &ModuleId) -> Option<&CompatRecord> {
        self.data.get(module)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, CompatError> {
    let text = fs::read_to_string(path).map_err(|source| CompatError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CompatError::ParseJson {
        path: path.display().to_string(),
        source,
    })
}
