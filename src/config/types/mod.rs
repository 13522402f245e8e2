//! Configuration types module
//!
//! Core settings live here; provider credentials and tool settings have
//! their own files.

pub mod provider;
pub mod tools;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent behaviour (iterations, debug output)
    #[serde(default)]
    pub agent: AgentConfig,

    /// LLM and search provider settings
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Per-tool settings
    #[serde(default)]
    pub tools: tools::ToolsConfig,
}

impl Config {
    /// Load configuration from defaults, the config file and the environment.
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Agent-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum LLM round-trips per query
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Show routing and timing details
    #[serde(default)]
    pub debug_mode: bool,
    /// Verbose logging
    #[serde(default)]
    pub verbose: bool,
    /// Show agent actions after each answer
    #[serde(default)]
    pub show_thinking: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            max_iterations: default_max_iterations(),
            debug_mode: false,
            verbose: false,
            show_thinking: false,
        }
    }
}

fn default_max_iterations() -> u32 {
    15
}

/// Configuration for conversation memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of messages kept in history
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// System message preset name or literal text
    pub system_message: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            max_messages: default_max_messages(),
            system_message: None,
        }
    }
}

fn default_max_messages() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.memory.max_messages, 100);
        assert_eq!(config.provider.openai.model, "gpt-3.5-turbo");
        assert!((config.provider.openai.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.provider.serpapi.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [agent]
            max_iterations = 4

            [memory]
            system_message = "scientific"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.memory.max_messages, 100);
        assert_eq!(config.memory.system_message.as_deref(), Some("scientific"));
        assert_eq!(config.tools.wiki_language, "en");
    }
}
