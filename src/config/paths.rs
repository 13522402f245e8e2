//! Configuration paths
//!
//! Utilities for resolving configuration file paths.

use std::path::PathBuf;

/// Get the configuration directory
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOOLAGENT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|d| d.join("toolagent"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config").join("toolagent"))
                .unwrap_or_else(|| PathBuf::from(".toolagent"))
        })
}

/// Get the main configuration file path
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("TOOLAGENT_CONFIG") {
        return PathBuf::from(path);
    }

    config_dir().join("config.toml")
}

/// Get the state directory
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOOLAGENT_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("toolagent"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share").join("toolagent"))
                .unwrap_or_else(|| PathBuf::from(".toolagent"))
        })
}

/// Get the workspace directory used as the code-execution working directory
pub fn workspace_dir() -> PathBuf {
    state_dir().join("workspace")
}
