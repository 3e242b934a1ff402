//! Sealed CLI - command-line front end for a Bitwarden vault
//!
//! Each invocation logs in (or unlocks), runs one vault operation and logs
//! out again. Settings, status, TOTP from a typed secret and the completion
//! generators run without a session.

mod cli;
mod commands;
mod error;
mod output;
mod util;

use clap::Parser;
use cli::Cli;
use sealed_core::tracing::{TracingConfig, TracingLevel, TracingOutput, init_tracing};

use crate::error::CliError;

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        TracingLevel::Error
    } else {
        TracingLevel::from_verbosity(cli.verbose)
    };
    let mut tracing_config = TracingConfig::new().with_level(level);
    if let Some(filter) = &cli.log_filter {
        tracing_config = tracing_config.with_filter(filter.as_str());
    }
    if let Some(path) = &cli.log_file {
        tracing_config = tracing_config.with_output(TracingOutput::File(path.clone()));
    }
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("Warning: {e}");
    }

    let result = tokio::runtime::Runtime::new()
        .map_err(CliError::from)
        .and_then(|runtime| runtime.block_on(commands::dispatch(&cli)));

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
