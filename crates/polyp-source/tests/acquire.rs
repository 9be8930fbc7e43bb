//! Cache behaviour of `SuiteSource::acquire` with an in-process fetcher.

use polyp_source::{Fetcher, Origin, SourceError, SuiteSource};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const TEMPLATE: &str = "https://suite.test/v{version}/tests.js";

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("{prefix}-{}-{unique}", std::process::id()));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("// fetched from {url}\nGLOBAL.tests = {{}};\n"))
    }
}

struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        Err(SourceError::Fetch {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build")
        .block_on(future)
}

#[test]
fn miss_fetches_once_then_hits_cache() {
    let tmp = TempDirGuard::new("polyp-source-cache");
    let fetcher = Arc::new(CountingFetcher::default());
    let source = SuiteSource::new(TEMPLATE, "3.38.1", tmp.path().join("cache"))
        .expect("template should be valid")
        .with_fetcher(fetcher.clone());

    let first = block_on(source.acquire()).expect("first acquire");
    assert_eq!(first.origin, Origin::Network);
    assert!(first.text.contains("https://suite.test/v3.38.1/tests.js"));
    assert!(source.cache_path().is_file());

    let second = block_on(source.acquire()).expect("second acquire");
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(second.text, first.text);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn fetch_failure_is_fatal_and_leaves_no_cache() {
    let tmp = TempDirGuard::new("polyp-source-fail");
    let source = SuiteSource::new(TEMPLATE, "3.38.1", tmp.path())
        .expect("template should be valid")
        .with_fetcher(Arc::new(FailingFetcher));

    let err = block_on(source.acquire()).expect_err("fetch should fail");
    assert!(matches!(err, SourceError::Fetch { .. }));
    assert!(!source.cache_path().exists());
}

#[test]
fn versions_do_not_share_cache_files() {
    let tmp = TempDirGuard::new("polyp-source-versions");
    let a = SuiteSource::new(TEMPLATE, "3.38.0", tmp.path()).expect("a");
    let b = SuiteSource::new(TEMPLATE, "3.38.1", tmp.path()).expect("b");
    assert_ne!(a.cache_path(), b.cache_path());
}

#[test]
fn unwritable_cache_reports_the_cache_path() {
    let tmp = TempDirGuard::new("polyp-source-unwritable");
    let blocker = tmp.path().join("not-a-dir");
    fs::write(&blocker, "").expect("blocking file");
    let source = SuiteSource::new(TEMPLATE, "3.38.1", blocker.join("cache"))
        .expect("template should be valid")
        .with_fetcher(Arc::new(CountingFetcher::default()));

    let err = block_on(source.acquire()).expect_err("cache write should fail");
    assert!(matches!(err, SourceError::Cache(_)), "{err:?}");
    assert!(err.to_string().contains("not-a-dir"), "{err}");
}
