//! Ontoload CLI
//!
//! Loads entity and relationship tables into a property graph, enforcing
//! declared relationship characteristics.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;
mod source;

use commands::Cli;

/// Initialize tracing with optional file logging.
///
/// Console output goes to stderr so `--json` reports stay clean on stdout.
fn init_tracing(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "ontoload=debug,ontoload_graph=debug"
    } else {
        "ontoload=info,ontoload_graph=info"
    };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(console).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.verbose)?;

    cli.execute().await
}
