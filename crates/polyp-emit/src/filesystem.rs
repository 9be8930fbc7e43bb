use crate::{BundleEmitter, EmitError, EmitReport, EmittedFile, check_name};
use polyp_kernel::{ContentHash, VirtualInputs};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Writes each virtual source verbatim under its logical name.
///
/// No resolution or minification happens; the output imports bare
/// `core-js/...` specifiers and expects a downstream bundler or an
/// import map to resolve them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEmitter;

impl BundleEmitter for FsEmitter {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn emit(&self, inputs: &VirtualInputs, out_dir: &Path) -> Result<EmitReport, EmitError> {
        for name in inputs.sources.keys() {
            check_name(name)?;
        }
        reset_dir(out_dir)?;
        for (name, source) in &inputs.sources {
            write_atomic(&out_dir.join(name), source.as_bytes())?;
        }
        let files = collect_files(out_dir)?;
        info!(
            target: "polyp::emit",
            emitter = self.name(),
            out_dir = %out_dir.display(),
            files = files.len(),
            "emitted bundle"
        );
        Ok(EmitReport {
            emitter: self.name().to_string(),
            out_dir: out_dir.to_path_buf(),
            entry: inputs.entry.clone(),
            files,
        })
    }
}

/// Remove `dir` and everything in it, then recreate it empty.
pub(crate) fn reset_dir(dir: &Path) -> Result<(), EmitError> {
    if dir.exists() {
        debug!(target: "polyp::emit", dir = %dir.display(), "clearing output directory");
        fs::remove_dir_all(dir).map_err(|e| EmitError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| EmitError::io(dir, e))
}

/// Write via a sibling temp file, fsync, then rename into place, creating
/// parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), EmitError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| EmitError::io(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), EmitError> {
        let mut file = File::create(&tmp_path).map_err(|e| EmitError::io(&tmp_path, e))?;
        file.write_all(contents)
            .map_err(|e| EmitError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| EmitError::io(&tmp_path, e))
    })();
    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        EmitError::io(path, e)
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

/// Every regular file under `root`, hashed, sorted by relative name.
pub(crate) fn collect_files(root: &Path) -> Result<Vec<EmittedFile>, EmitError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| EmitError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| EmitError::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| EmitError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| EmitError::io(&path, e))?;
            let name = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(EmittedFile {
                name,
                bytes: bytes.len() as u64,
                sha256: ContentHash::from_bytes(&bytes),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents_and_leaves_no_temp_files() {
        let dir = std::env::temp_dir().join(format!(
            "polyp-emit-atomic-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        let path = dir.join("nested/cache.txt");
        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "second");
        let leftovers = fs::read_dir(dir.join("nested")).expect("list").count();
        assert_eq!(leftovers, 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let path = Path::new("/out/index.js");
        let tmp = tmp_write_path(path);
        assert_eq!(tmp.parent(), path.parent());
        assert!(tmp.to_string_lossy().starts_with("/out/index.js.tmp."));
    }

    #[test]
    fn names_must_stay_inside_the_output_directory() {
        for name in ["", "..", "a/b.js", "a\\b.js", ".polyp-input"] {
            assert!(matches!(check_name(name), Err(EmitError::UnsafeName(_))), "{name}");
        }
        assert!(check_name("modern.js").is_ok());
    }
}
