//! Polyp CLI: the `polyp` command.

mod cli;
mod commands;
mod config;
mod logging;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);
    let config = || support::load_config_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::Build { suite, out, json } => {
            commands::build::run(&config(), suite.as_deref(), out.as_deref(), json)
        }
        Commands::Partition { json } => commands::partition::run(&config(), json),
        Commands::Extract { suite, json } => commands::extract::run(&config(), &suite, json),
        Commands::Checks { suite, json } => commands::checks::run(&config(), suite.as_deref(), json),
        Commands::Encode { text } => commands::codec::run_encode(&text),
        Commands::Decode { token } => commands::codec::run_decode(&token),
        Commands::CachePath { json } => commands::cache_path::run(&config(), json),
    }
}
