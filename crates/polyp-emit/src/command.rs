use crate::filesystem::{collect_files, reset_dir, write_atomic};
use crate::{BundleEmitter, EmitError, EmitReport, check_name};
use polyp_kernel::VirtualInputs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Directory under the output directory where virtual sources are staged
/// for the external bundler. Removed once the bundler succeeds.
pub const STAGING_DIR: &str = ".polyp-input";

/// Hands the cascade to an external bundler.
///
/// Virtual sources are staged as files, then `program args…` runs with
/// these placeholders substituted in each argument:
///
/// - `{input}`: the staging directory
/// - `{entry}`: the staged entry file
/// - `{out}`: the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEmitter {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandEmitter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expand_args(&self, input: &Path, entry: &Path, out: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let entry = entry.display().to_string();
        let out = out.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{entry}", &entry)
                    .replace("{out}", &out)
            })
            .collect()
    }

    fn run(&self, args: &[String]) -> Result<(), EmitError> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    EmitError::NotInstalled(self.program.clone())
                } else {
                    EmitError::CommandFailed {
                        program: self.program.clone(),
                        args: args.join(" "),
                        message: err.to_string(),
                    }
                }
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        Err(EmitError::CommandFailed {
            program: self.program.clone(),
            args: args.join(" "),
            message,
        })
    }
}

impl BundleEmitter for CommandEmitter {
    fn name(&self) -> &'static str {
        "command"
    }

    fn emit(&self, inputs: &VirtualInputs, out_dir: &Path) -> Result<EmitReport, EmitError> {
        for name in inputs.sources.keys() {
            check_name(name)?;
        }
        reset_dir(out_dir)?;
        let staging = out_dir.join(STAGING_DIR);
        for (name, source) in &inputs.sources {
            write_atomic(&staging.join(name), source.as_bytes())?;
        }

        let args = self.expand_args(&staging, &staging.join(&inputs.entry), out_dir);
        debug!(
            target: "polyp::emit",
            program = %self.program,
            args = %args.join(" "),
            "running bundler"
        );
        self.run(&args)?;
        fs::remove_dir_all(&staging).map_err(|e| EmitError::io(&staging, e))?;

        let files = collect_files(out_dir)?;
        info!(
            target: "polyp::emit",
            emitter = self.name(),
            program = %self.program,
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
