//! Module identifiers and opaque predicate source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a polyfill unit, e.g. `es.array.at` or `web.structured-clone`.
///
/// Identifiers are dotted paths; a module `a.b` is a dotted descendant of
/// `a`. Ordering is plain lexical ordering of the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` is a strict dotted descendant of `ancestor`.
    ///
    /// `es.array.at` descends from `es.array` and `es`, but not from
    /// `es.arr` or itself.
    pub fn descends_from(&self, ancestor: &ModuleId) -> bool {
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A runtime predicate carried as source text.
///
/// Fragments are re-embedded verbatim into generated code and are never
/// evaluated during the build. Equality is textual and is what predicate
/// de-duplication keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFragment(String);

impl SourceFragment {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The fragment as a zero-argument function returning its value, so
    /// evaluation happens only when the function is called.
    pub fn thunk(&self) -> String {
        format!("function () {{ return ({}); }}", self.0)
    }
}

impl fmt::Display for SourceFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
