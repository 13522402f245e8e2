//! Provider configuration types
//!
//! Credentials and endpoints for the OpenAI chat API and SerpAPI.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// SerpAPI configuration (web search is disabled without it)
    pub serpapi: Option<SerpApiConfig>,
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Chat model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Base URL
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: default_secret(),
            model: default_openai_model(),
            temperature: default_temperature(),
            base_url: default_openai_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// SerpAPI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpApiConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Base URL
    #[serde(default = "default_serpapi_url")]
    pub base_url: String,
}

impl SerpApiConfig {
    /// Create a config for the public SerpAPI endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        SerpApiConfig {
            api_key: SecretString::from(api_key.into()),
            base_url: default_serpapi_url(),
        }
    }
}

fn default_serpapi_url() -> String {
    "https://serpapi.com".to_string()
}
