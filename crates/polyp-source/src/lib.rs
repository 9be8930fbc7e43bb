//! Test-suite acquisition.
//!
//! The suite URL is templated from a pinned version. Its text is cached
//! on disk under a file named by the safe-token encoding of the URL, so
//! the cache key is reversible back to where the content came from.
//!
//! `SuiteSource::acquire` is the build's only suspension point: a cache
//! hit is an async file read, a miss is a blocking HTTP GET and atomic
//! cache write on the blocking pool. There is no retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Placeholder substituted with the suite version.
pub const VERSION_PLACEHOLDER: &str = "{version}";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/zloirock/core-js/refs/tags/v{version}/tests/compat/tests.js";

pub const DEFAULT_CACHE_DIR: &str = "node_modules/.cache/polyp";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("suite URL template `{0}` has no {{version}} placeholder")]
    MissingPlaceholder(String),

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("{}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("failed to write cache: {0}")]
    Cache(#[from] polyp_emit::EmitError),

    #[error("fetch task failed: {0}")]
    Task(String),
}

impl SourceError {
    fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Blocking retrieval of a URL's body.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, SourceError>;
}

/// HTTP GET through `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let fetch_err = |message: String| SourceError::Fetch {
            url: url.to_string(),
            message,
        };
        ureq::get(url)
            .call()
            .map_err(|e| fetch_err(e.to_string()))?
            .into_string()
            .map_err(|e| fetch_err(e.to_string()))
    }
}

/// Where the acquired text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub text: String,
    pub origin: Origin,
}

/// Substitute every `{version}` in `template`.
pub fn suite_url(template: &str, version: &str) -> Result<String, SourceError> {
    if !template.contains(VERSION_PLACEHOLDER) {
        return Err(SourceError::MissingPlaceholder(template.to_string()));
    }
    Ok(template.replace(VERSION_PLACEHOLDER, version))
}

/// Cache file for `url`: `cache_dir` joined with the encoded URL.
pub fn cache_path(cache_dir: impl AsRef<Path>, url: &str) -> PathBuf {
    cache_dir.as_ref().join(polyp_codec::encode(url))
}

#[derive(Clone)]
pub struct SuiteSource {
    url: String,
    cache_path: PathBuf,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for SuiteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteSource")
            .field("url", &self.url)
            .field("cache_path", &self.cache_path)
            .finish_non_exhaustive()
    }
}

impl SuiteSource {
    pub fn new(
        url_template: &str,
        version: &str,
        cache_dir: impl AsRef<Path>,
    ) -> Result<Self, SourceError> {
        let url = suite_url(url_template, version)?;
        let cache_path = cache_path(cache_dir, &url);
        Ok(Self {
            url,
            cache_path,
            fetcher: Arc::new(HttpFetcher),
        })
    }

    /// Use `fetcher` for cache misses instead of HTTP.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Cached text if present, otherwise fetch and cache.
    pub async fn acquire(&self) -> Result<Acquired, SourceError> {
        let is_cached = tokio::fs::metadata(&self.cache_path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_cached {
            let text = tokio::fs::read_to_string(&self.cache_path)
                .await
                .map_err(|e| SourceError::io(&self.cache_path, e))?;
            debug!(
                target: "polyp::source",
                path = %self.cache_path.display(),
                bytes = text.len(),
                "test suite cache hit"
            );
            return Ok(Acquired {
                text,
                origin: Origin::Cache,
            });
        }

        info!(target: "polyp::source", url = %self.url, "fetching test suite");
        let fetcher = Arc::clone(&self.fetcher);
        let url = self.url.clone();
        let cache_path = self.cache_path.clone();
        let text = tokio::task::spawn_blocking(move || -> Result<String, SourceError> {
            let text = fetcher.fetch(&url)?;
            polyp_emit::write_atomic(&cache_path, text.as_bytes())?;
            Ok(text)
        })
        .await
        .map_err(|e| SourceError::Task(e.to_string()))??;
        debug!(
            target: "polyp::source",
            path = %self.cache_path.display(),
            bytes = text.len(),
            "cached test suite"
        );
        Ok(Acquired {
            text,
            origin: Origin::Network,
        })
    }
}
