//! Versioned extraction seam.
//!
//! The extractor depends on the exact top-level shape of an upstream
//! program that changes between releases. Each supported shape lives in
//! its own `SuiteAdapter`; the registry picks one by suite version so a
//! new upstream layout means a new adapter and nothing else.

use crate::core_js::CoreJsTestsAdapter;
use crate::error::ExtractError;
use polyp_kernel::PredicateTable;
use semver::Version;
use serde::Serialize;
use tracing::debug;

/// What extraction yields: the retained helper program and the
/// module → predicates table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Every top-level statement except harness scaffolding and the test
    /// map, verbatim. Predicates reference these helpers at runtime.
    pub detection_prefix: String,
    pub predicates: PredicateTable,
}

pub trait SuiteAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, version: &Version) -> bool;

    fn extract(&self, source: &str) -> Result<Extraction, ExtractError>;
}

/// Ordered set of adapters; the first one supporting a version wins.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SuiteAdapter>>,
}

impl AdapterRegistry {
    /// A registry with no adapters.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    pub fn register(&mut self, adapter: impl SuiteAdapter + 'static) -> &mut Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn select(&self, version: &Version) -> Option<&dyn SuiteAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.supports(version))
            .map(Box::as_ref)
    }

    /// Extract `source`, published as suite `version`.
    pub fn extract(&self, source: &str, version: &str) -> Result<Extraction, ExtractError> {
        let parsed = parse_version(version)?;
        let adapter = self
            .select(&parsed)
            .ok_or_else(|| ExtractError::UnsupportedVersion(version.to_string()))?;
        debug!(target: "polyp::suite", adapter = adapter.name(), %parsed, "extracting test suite");
        adapter.extract(source)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(CoreJsTestsAdapter::default());
        registry
    }
}

/// Extract with the default adapters.
pub fn extract(source: &str, version: &str) -> Result<Extraction, ExtractError> {
    AdapterRegistry::default().extract(source, version)
}

/// Parse a suite version, tolerating the `v` of release tags.
pub fn parse_version(version: &str) -> Result<Version, ExtractError> {
    let trimmed = version.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|err| ExtractError::InvalidVersion {
        version: version.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyp_kernel::{ModuleId, SourceFragment};

    struct Fixed(&'static str);

    impl SuiteAdapter for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn supports(&self, version: &Version) -> bool {
            version.major == 4
        }

        fn extract(&self, _source: &str) -> Result<Extraction, ExtractError> {
            Ok(Extraction {
                detection_prefix: self.0.to_string(),
                predicates: [(ModuleId::from("es.x"), vec![SourceFragment::new("true")])]
                    .into_iter()
                    .collect(),
            })
        }
    }

    #[test]
    fn default_registry_selects_core_js_for_3x() {
        let registry = AdapterRegistry::default();
        let adapter = registry.select(&parse_version("3.38.1").unwrap()).unwrap();
        assert_eq!(adapter.name(), "core-js-tests");
        assert!(registry.select(&parse_version("4.0.0").unwrap()).is_none());
    }

    #[test]
    fn first_supporting_adapter_wins() {
        let mut registry = AdapterRegistry::default();
        registry.register(Fixed("first")).register(Fixed("second"));
        let extraction = registry.extract("ignored", "v4.0.0").unwrap();
        assert_eq!(extraction.detection_prefix, "first");
    }

    #[test]
    fn unsupported_and_invalid_versions() {
        assert_eq!(
            extract("", "5.0.0"),
            Err(ExtractError::UnsupportedVersion("5.0.0".to_string()))
        );
        assert!(matches!(
            extract("", "three"),
            Err(ExtractError::InvalidVersion { .. })
        ));
    }
}
