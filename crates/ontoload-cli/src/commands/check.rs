//! Connectivity check.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use ontoload_graph::{GraphStore, Neo4jStore};

use crate::config::Settings;

pub async fn execute(settings: &Settings) -> Result<ExitCode> {
    println!("{} {}", "Checking".bold(), settings.graph.uri.cyan());

    let result = match Neo4jStore::connect(&settings.graph).await {
        Ok(store) => {
            let checked = store.check_connectivity().await;
            store.close().await;
            checked
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            println!("  {} reachable (database {})", "✓".green(), settings.graph.database);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("  {} {}", "✗".red(), err);
            Ok(ExitCode::FAILURE)
        }
    }
}
