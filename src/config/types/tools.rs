//! Tool configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings shared by the built-in tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Default Wikipedia language code
    #[serde(default = "default_wiki_language")]
    pub wiki_language: String,
    /// Wikipedia base URL override (defaults to https://{lang}.wikipedia.org)
    pub wiki_base_url: Option<String>,
    /// Default number of web search results
    #[serde(default = "default_max_search_results")]
    pub max_search_results: u8,
    /// URL fetch timeout in seconds
    #[serde(default = "default_url_timeout")]
    pub url_timeout_secs: u64,
    /// Maximum characters returned by the URL fetch tool
    #[serde(default = "default_url_max_chars")]
    pub url_max_chars: usize,
    /// Python interpreter used for code execution
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    /// Code execution timeout in seconds
    #[serde(default = "default_code_timeout")]
    pub code_timeout_secs: u64,
    /// Working directory for code execution
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            wiki_language: default_wiki_language(),
            wiki_base_url: None,
            max_search_results: default_max_search_results(),
            url_timeout_secs: default_url_timeout(),
            url_max_chars: default_url_max_chars(),
            python_bin: default_python_bin(),
            code_timeout_secs: default_code_timeout(),
            workspace: default_workspace(),
        }
    }
}

fn default_wiki_language() -> String {
    "en".to_string()
}

fn default_max_search_results() -> u8 {
    5
}

fn default_url_timeout() -> u64 {
    10
}

fn default_url_max_chars() -> usize {
    1000
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_code_timeout() -> u64 {
    30
}

fn default_workspace() -> PathBuf {
    crate::config::workspace_dir()
}
