//! Configuration for tracklet.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI flags
//! 2. Environment variables (`TRACKLET_LISTEN`, `TRACKLET_DB`)
//! 3. Config file (tracklet.yaml)
//! 4. Defaults

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default address the server binds when nothing else is configured.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8164";
/// Default database filename, relative to the working directory.
pub const DEFAULT_DB_FILENAME: &str = "tracklet.db";
/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "tracklet.yaml";

/// Resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Address and port to listen on.
    pub listen: String,
    /// Path to the SQLite database file.
    pub database: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR.to_string(),
            database: PathBuf::from(DEFAULT_DB_FILENAME),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults. Empty values fall back to
    /// their defaults as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&contents)?;

        if config.listen.trim().is_empty() {
            config.listen = DEFAULT_LISTEN_ADDR.to_string();
        }
        if config.database.as_os_str().is_empty() {
            config.database = PathBuf::from(DEFAULT_DB_FILENAME);
        }

        Ok(config)
    }

    /// Apply CLI and environment overrides on top of file values.
    pub fn apply_overrides(&mut self, listen: Option<String>, database: Option<PathBuf>) {
        if let Some(listen) = listen {
            if !listen.trim().is_empty() {
                self.listen = listen;
            }
        }
        if let Some(database) = database {
            if !database.as_os_str().is_empty() {
                self.database = database;
            }
        }
    }
}
