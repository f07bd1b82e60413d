//! `ontoload.toml` settings with environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use ontoload_graph::GraphConfig;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ontoload.toml";

/// How `load` drives the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// One task per row on a bounded worker pool.
    #[default]
    Concurrent,
    /// Each file as one all-or-nothing transaction.
    Batch,
    /// One row at a time, in file order.
    Sequential,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub workers: usize,
    pub mode: IngestMode,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            workers: 10,
            mode: IngestMode::Concurrent,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graph: GraphConfig,
    pub ingest: IngestSettings,
}

impl Settings {
    /// Read `explicit`, or `ontoload.toml` if present, then apply `NEO4J_*`
    /// environment variables.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.graph.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.password = password;
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.graph.database = database;
        }
    }
}
