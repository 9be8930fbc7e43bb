//! Bundle emitters.
//!
//! The cascade leaves the kernel as named virtual sources. An emitter is
//! the only thing that writes build output: it owns the output directory,
//! clears it, and reports what it produced.

mod command;
mod filesystem;

pub use command::CommandEmitter;
pub use filesystem::{FsEmitter, write_atomic};

use polyp_kernel::{ContentHash, VirtualInputs};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("{}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("virtual source name `{0}` is not a plain file name")]
    UnsafeName(String),

    #[error("{0} is not available in PATH")]
    NotInstalled(String),

    #[error("bundler command failed: {program} {args} ({message})")]
    CommandFailed {
        program: String,
        args: String,
        message: String,
    },
}

impl EmitError {
    pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

pub trait BundleEmitter {
    fn name(&self) -> &'static str;

    /// Produce output for `inputs` in `out_dir`, replacing whatever the
    /// directory held before.
    fn emit(&self, inputs: &VirtualInputs, out_dir: &Path) -> Result<EmitReport, EmitError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedFile {
    /// Path relative to the output directory, `/`-separated.
    pub name: String,
    pub bytes: u64,
    pub sha256: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub emitter: String,
    pub out_dir: PathBuf,
    pub entry: String,
    /// Sorted by name.
    pub files: Vec<EmittedFile>,
}

impl EmitReport {
    pub fn file(&self, name: &str) -> Option<&EmittedFile> {
        self.files.iter().find(|file| file.name == name)
    }
}

/// A logical name must land directly inside the output directory.
pub(crate) fn check_name(name: &str) -> Result<(), EmitError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with(".polyp");
    if plain {
        Ok(())
    } else {
        Err(EmitError::UnsafeName(name.to_string()))
    }
}
