//! Graph counts.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use ontoload_core::{Label, RelType};
use ontoload_graph::{graph_counts, GraphStore, Neo4jStore};

use crate::config::Settings;
use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    /// Only count nodes with this label
    #[arg(long)]
    pub label: Option<String>,

    /// Only count relationships of this type
    #[arg(long)]
    pub rel: Option<String>,
}

pub async fn execute(args: StatusArgs, settings: &Settings) -> Result<ExitCode> {
    let label = args.label.as_deref().map(Label::new).transpose()?;
    let rel = args.rel.as_deref().map(RelType::new).transpose()?;

    let store = Neo4jStore::connect(&settings.graph)
        .await
        .context("Failed to connect to Neo4j")?;
    let counts = graph_counts(&store, label.as_ref(), rel.as_ref()).await?;
    store.close().await;

    output::print_counts(&counts);
    Ok(ExitCode::SUCCESS)
}
