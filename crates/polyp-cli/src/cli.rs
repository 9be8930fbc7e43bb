use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "polyp",
    about = "Polyp: tiered, self-detecting core-js polyfill bundles",
    version
)]
pub struct Cli {
    /// Path to polyp.toml (a missing default file means built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. warn, info, polyp::suite=debug)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Partition, extract, generate the cascade, and emit the bundle
    Build {
        /// Use a local test-suite file instead of the cached/fetched one
        #[arg(long)]
        suite: Option<PathBuf>,

        /// Output directory (overrides `out_dir`)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the stable, modern, and legacy module sets
    Partition {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the predicates extracted from a test-suite file
    Extract {
        /// Test-suite source file
        #[arg(long)]
        suite: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved predicates of every module, per tier
    Checks {
        /// Use a local test-suite file instead of the cached/fetched one
        #[arg(long)]
        suite: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode text as a path-safe token
    Encode {
        /// Text to encode
        text: String,
    },

    /// Decode a path-safe token
    Decode {
        /// Token to decode
        token: String,
    },

    /// Print the cache file of the configured test-suite URL
    CachePath {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
