//! Error types for sfn-verify
//!
//! Analysis over a fetched history never fails; errors come from the
//! history source, configuration, the condition poller and scenario
//! assertions.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sfn-verify
#[derive(Error, Debug)]
pub enum Error {
    // === Poller Errors ===
    #[error("Condition not met within {timeout_ms} ms")]
    ConditionTimeout { timeout_ms: u64 },

    // === History Source Errors ===
    #[error("No history found for execution '{execution}' (looked for {path})")]
    HistoryNotFound { execution: String, path: String },

    #[error("History source error: {0}")]
    HistorySource(String),

    #[error("Invalid history document: {0}")]
    InvalidHistory(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === CLI Errors ===
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),
}

impl Error {
    /// Create a history not found error
    pub fn history_not_found(execution: &str, path: &std::path::Path) -> Self {
        Self::HistoryNotFound {
            execution: execution.to_string(),
            path: path.display().to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this is the poller's timeout failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConditionTimeout { .. })
    }
}
