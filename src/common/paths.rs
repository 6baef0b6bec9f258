//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/marcus/`
//! - macOS: `~/Library/Application Support/marcus/`
//! - Windows: `%APPDATA%\marcus\`

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "marcus";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
