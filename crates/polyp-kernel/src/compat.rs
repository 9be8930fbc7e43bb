//! The compatibility-data seam.
//!
//! Support data (which environment ships which feature, and which
//! modules a browser query needs) is supplied by an external provider.
//! The kernel only consumes it through [`CompatibilityProvider`].

use crate::error::KernelError;
use crate::module::ModuleId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A dotted numeric environment version such as `15.4` or `4.4.3`.
///
/// Comparison pads the shorter side with zeros, so `15.4 == 15.4.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(Vec<u32>);

impl Version {
    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("empty version".to_string());
        }
        trimmed
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| format!("invalid version component `{part}` in `{trimmed}`"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for idx in 0..len {
            let a = self.0.get(idx).copied().unwrap_or(0);
            let b = other.0.get(idx).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Per-module support record: environment family → first version that
/// ships the feature natively. A missing family means "never shipped".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatRecord(pub BTreeMap<String, Version>);

impl CompatRecord {
    pub fn min_version(&self, family: &str) -> Option<&Version> {
        self.0.get(family)
    }

    /// Whether any of `families` has shipped the feature.
    pub fn shipped_by_any(&self, families: &[String]) -> bool {
        families.iter().any(|family| self.0.contains_key(family))
    }

    /// Whether an environment at `version` of `family` lacks the feature.
    pub fn needed_by(&self, family: &str, version: &Version) -> bool {
        match self.0.get(family) {
            Some(min) => version < min,
            None => true,
        }
    }
}

/// Resolved query targets: environment family → oldest version to support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSet(pub BTreeMap<String, Version>);

impl TargetSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Version)> {
        self.0.iter()
    }
}

/// A declarative support query.
///
/// `label` is the human-facing query expression (e.g. a browserslist
/// string); resolving it into concrete targets is the provider's
/// business. `entry` restricts the candidate modules to a named entry
/// point; `targets` restricts them to modules some target still needs.
/// A query with neither returns every module the provider knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportQuery {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<TargetSet>,
}

impl SupportQuery {
    /// Every module reachable from `entry`, regardless of environment.
    pub fn entry(entry: impl Into<String>) -> Self {
        let entry = entry.into();
        Self {
            label: entry.clone(),
            entry: Some(entry),
            targets: None,
        }
    }

    /// Modules needed by at least one of `targets`.
    pub fn targets(label: impl Into<String>, targets: TargetSet) -> Self {
        Self {
            label: label.into(),
            entry: None,
            targets: Some(targets),
        }
    }
}

/// Supplier of compatibility data. Consumed read-only.
pub trait CompatibilityProvider {
    /// Evaluate `query` into the modules needing a polyfill under it, in
    /// the provider's canonical module order.
    fn evaluate(&self, query: &SupportQuery) -> Result<Vec<ModuleId>, KernelError>;

    /// The support record of one module, if the provider has one.
    fn record(&self, module: &ModuleId) -> Option<&CompatRecord>;
}
