//! Configuration and history file paths

use std::path::{Path, PathBuf};

/// Name used for the configuration directory
const APP_NAME: &str = "sfn-verify";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/sfn-verify/`
/// - macOS: `~/Library/Application Support/sfn-verify/`
/// - Windows: `%APPDATA%\sfn-verify\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// File name a history document is stored under for an execution identifier
///
/// ARNs contain `:` and may contain `/`, neither of which is portable in file
/// names, so both become `_`.
pub fn history_file_name(execution: &str) -> String {
    let sanitized: String = execution
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("{}.json", sanitized)
}

/// Resolve a path relative to `base` unless it is already absolute
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}
