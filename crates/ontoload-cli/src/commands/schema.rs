//! Uniqueness constraint installation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use ontoload_core::Label;
use ontoload_graph::{ensure_unique_ids, GraphStore, Neo4jStore};

use crate::config::Settings;

#[derive(Args)]
pub struct SchemaArgs {
    /// Node labels to constrain
    #[arg(required = true)]
    pub labels: Vec<String>,
}

pub async fn execute(args: SchemaArgs, settings: &Settings) -> Result<ExitCode> {
    let labels = args
        .labels
        .iter()
        .map(Label::new)
        .collect::<Result<Vec<_>, _>>()?;

    let store = Neo4jStore::connect(&settings.graph)
        .await
        .context("Failed to connect to Neo4j")?;
    let mut session = store.session().await?;
    ensure_unique_ids(&mut session, &labels).await?;
    store.close().await;

    for label in &labels {
        println!("  {} {} (id unique)", "✓".green(), label.to_string().cyan());
    }
    Ok(ExitCode::SUCCESS)
}
