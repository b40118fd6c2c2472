//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;
use crate::analysis::SlaThresholds;
use crate::poller::WaitOptions;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Condition poller defaults
    #[serde(default)]
    pub poller: PollerConfig,

    /// Where execution histories are read from
    #[serde(default)]
    pub history: HistoryConfig,

    /// Default SLA thresholds for the `sla` and `analyze` commands
    #[serde(default)]
    pub sla: SlaThresholds,
}

/// Poller settings in milliseconds
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Give up after this long without the condition holding
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sleep between attempts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_interval_ms() -> u64 {
    1_000
}

impl PollerConfig {
    /// Wait options built from these settings
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(
            Duration::from_millis(self.timeout_ms),
            Duration::from_millis(self.interval_ms),
        )
    }
}

/// History source settings
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding `<execution>.json` history documents
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
        }
    }
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, e))?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
