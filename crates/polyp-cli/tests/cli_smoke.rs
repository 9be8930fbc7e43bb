use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "polyp-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
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

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn run_polyp<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_polyp");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("polyp command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// A config pointing at the fixture catalog, with all writable paths
/// under `root`.
fn write_config(root: &Path) -> PathBuf {
    let catalog = fixtures().join("catalog");
    let text = format!(
        r#"core_js_version = "3.38.1"
catalog_dir = {catalog:?}
cache_dir = {cache:?}
out_dir = {out:?}

[queries.modern]
label = "fixture modern"
targets = {{ chrome = "120", firefox = "115", safari = "16.4", ios = "16.4" }}
"#,
        catalog = catalog.display().to_string(),
        cache = root.join("cache").display().to_string(),
        out = root.join("dist").display().to_string(),
    );
    let path = root.join("polyp.toml");
    fs::write(&path, text).expect("config should be written");
    path
}

fn names(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|v| v.as_str().expect("string"))
        .collect()
}

#[test]
fn encode_decode_round_trip() {
    let encoded = run_polyp(["encode", "Hi/There!"]);
    assert_success(&encoded);
    let token = stdout_text(&encoded).trim().to_string();
    assert_eq!(token, "!hi_!there%21");

    let decoded = run_polyp(["decode", token.as_str()]);
    assert_success(&decoded);
    assert_eq!(stdout_text(&decoded).trim_end_matches('\n'), "Hi/There!");
}

#[test]
fn decode_rejects_foreign_escape() {
    let output = run_polyp(["decode", "abc%zz"]);
    assert_failure(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(stderr.contains("%zz"), "{stderr}");
}

#[test]
fn partition_json_reports_tiers() {
    let tmp = TempDirGuard::new("partition");
    let config = write_config(tmp.path());

    let output = run_polyp([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("partition"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(
        names(&payload["modern"]),
        vec!["es.promise.with-resolvers", "web.structured-clone"]
    );
    assert_eq!(
        names(&payload["legacy"]),
        vec!["es.array.at", "es.array.flat", "es.object.has-own", "es.promise"]
    );
    assert_eq!(payload["stable"].as_array().map(Vec::len), Some(6));
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = TempDirGuard::new("no-config");
    let output = run_polyp([
        OsStr::new("--config"),
        tmp.path().join("absent.toml").as_os_str(),
        OsStr::new("partition"),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.toml"));
}

#[test]
fn extract_json_lists_fixture_modules() {
    let tmp = TempDirGuard::new("extract");
    let config = write_config(tmp.path());
    let suite = fixtures().join("tests.js");

    let output = run_polyp([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("extract"),
        OsStr::new("--suite"),
        suite.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["module_count"], 7);
    assert_eq!(
        payload["predicates"]["web.structured-clone"][0],
        "function () {\n    return true\n      && true;\n  }"
    );
}

#[test]
fn checks_json_merges_per_tier() {
    let tmp = TempDirGuard::new("checks");
    let config = write_config(tmp.path());
    let suite = fixtures().join("tests.js");

    let output = run_polyp([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("checks"),
        OsStr::new("--suite"),
        suite.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["modern"]["merged_predicate_count"], 3);
    assert_eq!(payload["legacy"]["merged_predicate_count"], 6);
    assert_eq!(payload["legacy"]["unchecked"].as_array().map(Vec::len), Some(0));
    // es.promise has no test of its own and inherits from its sub-modules.
    let promise = payload["legacy"]["modules"]["es.promise"]
        .as_array()
        .expect("es.promise predicates");
    assert_eq!(promise[0], "PROMISES_SUPPORT");
    assert!(promise.len() >= 3);
}

#[test]
fn build_emits_cascade_reproducibly() {
    let tmp = TempDirGuard::new("build");
    let config = write_config(tmp.path());
    let suite = fixtures().join("tests.js");
    let out = tmp.path().join("dist");

    let build = || {
        let output = run_polyp([
            OsStr::new("--config"),
            config.as_os_str(),
            OsStr::new("build"),
            OsStr::new("--suite"),
            suite.as_os_str(),
            OsStr::new("--out"),
            out.as_os_str(),
            OsStr::new("--json"),
        ]);
        assert_success(&output);
        parse_json_stdout(&output)
    };

    let first = build();
    let digest = first["build_digest"].as_str().expect("digest").to_string();
    assert!(digest.starts_with("build1_"), "{digest}");

    let files: Vec<&str> = first["emit"]["files"]
        .as_array()
        .expect("files")
        .iter()
        .map(|f| f["name"].as_str().expect("name"))
        .collect();
    assert_eq!(files, vec!["index.js", "legacy.js", "modern.js"]);

    let index = fs::read_to_string(out.join("index.js")).expect("index.js");
    assert!(index.starts_with("import GLOBAL from \"core-js/internals/global-this\";\n"));
    assert!(index.contains("var PROMISES_SUPPORT = function () {"));
    assert!(index.contains("import(\"./modern.js\")"));
    assert!(!index.contains("import \"core-js/modules/"));

    let modern = fs::read_to_string(out.join("modern.js")).expect("modern.js");
    assert!(modern.starts_with(
        "import \"core-js/modules/es.promise.with-resolvers\";\nimport \"core-js/modules/web.structured-clone\";\n"
    ));
    assert!(modern.contains("import(\"./legacy.js\")"));

    let legacy = fs::read_to_string(out.join("legacy.js")).expect("legacy.js");
    assert_eq!(
        legacy,
        "import \"core-js/modules/es.array.at\";\n\
         import \"core-js/modules/es.array.flat\";\n\
         import \"core-js/modules/es.object.has-own\";\n\
         import \"core-js/modules/es.promise\";\n"
    );

    let second = build();
    assert_eq!(second["build_digest"], first["build_digest"]);
}

#[test]
fn cache_path_is_encoded_suite_url() {
    let tmp = TempDirGuard::new("cache-path");
    let config = write_config(tmp.path());

    let output = run_polyp([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("cache-path"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let url = payload["url"].as_str().expect("url");
    assert_eq!(
        url,
        "https://raw.githubusercontent.com/zloirock/core-js/refs/tags/v3.38.1/tests/compat/tests.js"
    );
    assert_eq!(payload["cached"], false);

    let path = PathBuf::from(payload["cache_path"].as_str().expect("cache_path"));
    assert!(path.starts_with(tmp.path().join("cache")));
    let name = path.file_name().and_then(OsStr::to_str).expect("file name");
    let decoded = run_polyp(["decode", name]);
    assert_success(&decoded);
    assert_eq!(stdout_text(&decoded).trim_end(), url);
}
