//! Configuration and log file locations

use std::path::{Path, PathBuf};

/// Name used for the per-user config directory
const APP_NAME: &str = "apichain";

/// File name of the harness configuration
pub const CONFIG_FILE_NAME: &str = "apichain.toml";

/// Get the per-user configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/apichain/`
/// - macOS: `~/Library/Application Support/apichain/`
/// - Windows: `%APPDATA%\apichain\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the per-user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Find the configuration file to use
///
/// An explicit path always wins. Otherwise `./apichain.toml` is tried first,
/// then the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    user_config_path().filter(|p| p.exists())
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}
