//! Content digests for reproducible builds.
//!
//! Identical inputs must yield byte-identical fragments; the build digest
//! makes that checkable across runs and keys emitted artifacts.

use crate::cascade::VirtualInputs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A sha256 content hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{hash:x}"))
    }

    pub fn from_str_content(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// First `len` hex characters, for short file-name hashes.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn builder() -> ContentHashBuilder {
        ContentHashBuilder {
            hasher: Sha256::new(),
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental content hash builder.
///
/// Fields are length-prefixed so that adjacent values cannot run
/// together.
pub struct ContentHashBuilder {
    hasher: Sha256,
}

impl ContentHashBuilder {
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.hasher.update(name.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.len().to_string().as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b"\n");
        self
    }

    pub fn build(self) -> ContentHash {
        let hash = self.hasher.finalize();
        ContentHash(format!("{hash:x}"))
    }
}

/// Deterministic identifier of one build's generated sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildDigest(pub String);

impl BuildDigest {
    pub fn of(inputs: &VirtualInputs) -> Self {
        let mut builder = ContentHash::builder().field("entry", &inputs.entry);
        // BTreeMap iteration keeps this independent of generation order.
        for (name, source) in &inputs.sources {
            builder = builder.field(name, source);
        }
        Self(format!("build1_{}", builder.build()))
    }
}

impl fmt::Display for BuildDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn inputs(entry_source: &str) -> VirtualInputs {
        let mut sources = BTreeMap::new();
        sources.insert("index.js".to_string(), entry_source.to_string());
        sources.insert("legacy.js".to_string(), String::new());
        VirtualInputs {
            entry: "index.js".to_string(),
            sources,
        }
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            ContentHash::from_str_content("").0,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(ContentHash::from_str_content("").short(8), "e3b0c442");
    }

    #[test]
    fn build_digest_tracks_content() {
        let a = BuildDigest::of(&inputs("a"));
        assert_eq!(a, BuildDigest::of(&inputs("a")));
        assert_ne!(a, BuildDigest::of(&inputs("b")));
        assert!(a.0.starts_with("build1_"));
    }
}
