//! Process configuration for the sync runner.
//!
//! # Responsibility
//! - Describe where the Bear database, export root, and logs live.
//! - Load overrides from a JSON file and validate the merged result.
//!
//! # Invariants
//! - A validated config has an absolute export root and log directory.
//! - The polling interval is never zero.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Seconds between passes when no interval is configured.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

const BEAR_DATABASE_RELATIVE_PATH: &str =
    "Library/Containers/net.shinyfrog.bear/Data/Documents/Application Data/database.sqlite";
const LOG_DIR_RELATIVE_PATH: &str = "Library/Logs/bearsync";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runner configuration. Missing file keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Bear's `database.sqlite`.
    pub database_path: PathBuf,
    /// Export root the notes are mirrored into.
    pub root: PathBuf,
    /// Delay between the end of one pass and the start of the next.
    pub interval_secs: u64,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            database_path: home
                .as_ref()
                .map(|home| home.join(BEAR_DATABASE_RELATIVE_PATH))
                .unwrap_or_default(),
            root: PathBuf::new(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            log_level: default_log_level().to_string(),
            log_dir: home
                .map(|home| home.join(LOG_DIR_RELATIVE_PATH))
                .unwrap_or_else(|| std::env::temp_dir().join("bearsync-logs")),
        }
    }
}

impl SyncConfig {
    /// Reads a JSON config file on top of the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Checks the merged configuration before any store is opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path must be set".to_string(),
            ));
        }
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("root must be set".to_string()));
        }
        if !self.root.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "root must be an absolute path, got `{}`",
                self.root.display()
            )));
        }
        if !self.log_dir.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "log_dir must be an absolute path, got `{}`",
                self.log_dir.display()
            )));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
