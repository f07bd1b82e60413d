//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod check;
pub mod load;
pub mod schema;
pub mod status;

/// Ontoload - load entity and relationship tables into a property graph
#[derive(Parser)]
#[command(name = "ontoload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (defaults to ./ontoload.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load entity_*.csv and relation-*.csv files
    Load(load::LoadArgs),

    /// Verify the graph store is reachable
    Check,

    /// Install (label, id) uniqueness constraints
    Schema(schema::SchemaArgs),

    /// Show node and relationship counts
    Status(status::StatusArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        let settings = Settings::load(self.config.as_deref())?;

        match self.command {
            Commands::Load(args) => load::execute(args, &settings).await,
            Commands::Check => check::execute(&settings).await,
            Commands::Schema(args) => schema::execute(args, &settings).await,
            Commands::Status(args) => status::execute(args, &settings).await,
        }
    }
}
