//! Server configuration.
//!
//! Settings come from `config.json` in the platform config directory (e.g.
//! `~/.config/study-planner/config.json`), falling back to defaults, and are
//! then overridden by environment variables:
//!
//! - `STUDY_PLANNER_PORT`
//! - `STUDY_PLANNER_DB` (path to the SQLite file)
//! - `STUDY_PLANNER_HISTORY_LIMIT`
//! - `STUDY_PLANNER_MAX_CONVERSATIONS`

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assistant::{DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_CONVERSATIONS};
use crate::db::Database;

const APP_NAME: &str = "study-planner";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Port for the HTTP API.
    pub port: u16,
    /// SQLite database file. Uses the platform data directory when unset.
    pub database_path: Option<PathBuf>,
    /// Exchanges kept per chat conversation.
    pub history_limit: usize,
    /// Conversations kept in memory before the least recent is evicted.
    pub max_conversations: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
        }
    }
}

impl PlannerConfig {
    /// Load the config file, then apply environment overrides.
    /// A missing or unreadable file means defaults.
    pub fn load() -> Self {
        let config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply `STUDY_PLANNER_*` overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = var("STUDY_PLANNER_PORT").and_then(|s| s.parse().ok()) {
            self.port = port;
        }
        if let Some(path) = var("STUDY_PLANNER_DB").filter(|s| !s.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(limit) = var("STUDY_PLANNER_HISTORY_LIMIT").and_then(|s| s.parse().ok()) {
            self.history_limit = limit;
        }
        if let Some(max) = var("STUDY_PLANNER_MAX_CONVERSATIONS").and_then(|s| s.parse().ok()) {
            self.max_conversations = max;
        }
        self
    }

    pub fn open_database(&self) -> Result<Database> {
        match &self.database_path {
            Some(path) => Database::open(path.clone()),
            None => Database::open_default(),
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}
