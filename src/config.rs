//! Runtime tunables
//!
//! Read from a JSON file (`--config <file>`, or `cinefacet.json` in the working
//! directory when present). Every key is optional; CLI flags override.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "cinefacet.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rows per table page
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
    /// Bubble groups kept in the hierarchy view
    #[serde(default = "default_top_groups")]
    pub top_groups: usize,
    #[serde(default = "default_max_films_per_group")]
    pub max_films_per_group: usize,
    /// Most frequent companies offered in the production picker
    #[serde(default = "default_production_options")]
    pub production_options: usize,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Undo depth; unbounded when absent
    #[serde(default)]
    pub history_limit: Option<usize>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_items_per_page() -> usize {
    10
}
fn default_top_groups() -> usize {
    18
}
fn default_max_films_per_group() -> usize {
    250
}
fn default_production_options() -> usize {
    200
}
fn default_port() -> u16 {
    3001
}
fn default_cache_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            top_groups: default_top_groups(),
            max_films_per_group: default_max_films_per_group(),
            production_options: default_production_options(),
            port: default_port(),
            history_limit: None,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Explicit path if given, else `cinefacet.json` in `dir` if it exists,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.items_per_page == 0 {
            return Err(Error::Config("items_per_page must be at least 1".to_string()));
        }
        if self.top_groups == 0 || self.max_films_per_group == 0 {
            return Err(Error::Config("hierarchy limits must be at least 1".to_string()));
        }
        if self.production_options == 0 {
            return Err(Error::Config("production_options must be at least 1".to_string()));
        }
        Ok(())
    }
}
