//! Store configuration.
//!
//! Values come from built-in defaults, then `<store_dir>/config.yaml` if it
//! exists, then environment overrides:
//!
//! - `TASKLEDGER_STORE`: store directory (also where `config.yaml` is looked up)
//! - `TASKLEDGER_COMPLETION_THRESHOLD`: minimum verification score that completes a task

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ports::FileSystem;

/// Env var naming the store directory.
pub const STORE_ENV: &str = "TASKLEDGER_STORE";
/// Env var overriding the completion threshold.
pub const THRESHOLD_ENV: &str = "TASKLEDGER_COMPLETION_THRESHOLD";
/// File name of the optional config file inside the store directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Tunables for the task store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the store.
    pub store_dir: PathBuf,
    /// Scores at or above this complete the task.
    pub completion_threshold: u8,
    /// Minimum trimmed summary length accepted by verification.
    pub min_summary_len: usize,
    /// Cap on deleted-task records returned per listing.
    pub deleted_page_size: usize,
    /// Default number of history entries returned.
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".taskledger"),
            completion_threshold: 80,
            min_summary_len: 30,
            deleted_page_size: 50,
            history_limit: 100,
        }
    }
}

impl Config {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the config file or an override is malformed.
    pub fn load(fs: &dyn FileSystem) -> Result<Self> {
        Self::resolve(fs, |key| std::env::var(key).ok())
    }

    /// Resolves configuration using `env` to look up overrides.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the config file or an override is malformed.
    pub fn resolve(fs: &dyn FileSystem, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store_dir = env(STORE_ENV).map_or_else(|| Self::default().store_dir, PathBuf::from);

        let file = store_dir.join(CONFIG_FILE);
        let mut config = if fs.exists(&file) {
            let contents = fs
                .read_to_string(&file)
                .map_err(|e| Error::Persistence(format!("Failed to read {}: {e}", file.display())))?;
            Self::from_yaml(&contents)?
        } else {
            Self::default()
        };
        config.store_dir = store_dir;

        if let Some(raw) = env(THRESHOLD_ENV) {
            config.completion_threshold = raw.trim().parse().map_err(|e| {
                Error::InvalidInput(format!("{THRESHOLD_ENV}={raw} is not a valid score: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML config document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the YAML is malformed.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("Failed to parse {CONFIG_FILE}: {e}")))
    }

    fn validate(&self) -> Result<()> {
        if self.completion_threshold > 100 {
            return Err(Error::InvalidInput(format!(
                "completion_threshold must be within 0..=100, got {}",
                self.completion_threshold
            )));
        }
        if self.deleted_page_size == 0 {
            return Err(Error::InvalidInput("deleted_page_size must be positive".to_string()));
        }
        Ok(())
    }
}
