//! Logging initialization and configuration.
//!
//! This module sets up the tracing subscriber based on CLI flags.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Cli, Commands};

/// Initialize the logging subsystem based on CLI flags.
///
/// Sets the log level based on verbosity flags and suppresses info logs
/// when JSON output is requested.
///
/// # Errors
///
/// Returns an error if the global tracing subscriber cannot be set.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let mut level = level_for(cli.verbose || cli.debug, cli.quiet);

    // Keep stderr quiet while stdout carries JSON, unless verbose/debug was asked for.
    if !(cli.verbose || cli.debug) {
        let machine_output = match &cli.command {
            Commands::Generate { format, .. } | Commands::Routes { format, .. } => {
                format.is_machine()
            },
            _ => false,
        };
        if machine_output {
            level = Level::ERROR;
        }
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

const fn level_for(verbose: bool, quiet: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    }
}
