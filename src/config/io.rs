//! Configuration I/O - Loading configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;
use std::str::FromStr;

use secrecy::SecretString;
use tracing::{debug, warn};

use super::types::provider::SerpApiConfig;
use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        debug!("Loading config file {}", config_path.display());
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        toml::from_str(&content)
            .or_else(|_| json5::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, so variables set there behave like real ones.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary variable source.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    // OpenAI
    if let Some(api_key) = get("OPENAI_API_KEY") {
        config.provider.openai.api_key = SecretString::from(api_key.trim().to_string());
    }
    if let Some(model) = get("MODEL_NAME") {
        config.provider.openai.model = model;
    }
    if let Some(temperature) = parse_var(&get, "TEMPERATURE") {
        config.provider.openai.temperature = temperature;
    }
    if let Some(url) = get("OPENAI_BASE_URL") {
        config.provider.openai.base_url = url.trim_end_matches('/').to_string();
    }

    // SerpAPI
    if let Some(api_key) = get("SERPAPI_API_KEY") {
        let serp = config
            .provider
            .serpapi
            .get_or_insert_with(|| SerpApiConfig::new(String::new()));
        serp.api_key = SecretString::from(api_key.trim().to_string());
    }
    if let Some(url) = get("SERPAPI_BASE_URL") {
        if let Some(ref mut serp) = config.provider.serpapi {
            serp.base_url = url.trim_end_matches('/').to_string();
        }
    }

    // Agent
    if let Some(max_iterations) = parse_var(&get, "MAX_ITERATIONS") {
        config.agent.max_iterations = max_iterations;
    }
    if let Some(debug_mode) = get("DEBUG_MODE") {
        config.agent.debug_mode = parse_bool(&debug_mode);
    }
    if let Some(verbose) = get("VERBOSE") {
        config.agent.verbose = parse_bool(&verbose);
    }

    // Tools
    if let Some(language) = get("WIKI_LANGUAGE") {
        config.tools.wiki_language = language.trim().to_lowercase();
    }
    if let Some(url) = get("WIKI_BASE_URL") {
        config.tools.wiki_base_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(max_results) = parse_var(&get, "MAX_SEARCH_RESULTS") {
        config.tools.max_search_results = max_results;
    }
    if let Some(timeout) = parse_var(&get, "URL_TIMEOUT") {
        config.tools.url_timeout_secs = timeout;
    }
    if let Some(python) = get("PYTHON_BIN") {
        config.tools.python_bin = python;
    }
    if let Some(timeout) = parse_var(&get, "CODE_TIMEOUT") {
        config.tools.code_timeout_secs = timeout;
    }
}

/// Parse a variable, logging and ignoring malformed values
fn parse_var<T, G>(get: &G, key: &str) -> Option<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_overrides_from(
            &mut config,
            lookup(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("MODEL_NAME", "gpt-4o-mini"),
                ("TEMPERATURE", "0.2"),
                ("MAX_ITERATIONS", "5"),
                ("DEBUG_MODE", "true"),
                ("WIKI_LANGUAGE", "FR"),
                ("MAX_SEARCH_RESULTS", "3"),
                ("URL_TIMEOUT", "20"),
            ]),
        );

        assert_eq!(config.provider.openai.api_key.expose_secret(), "sk-test");
        assert_eq!(config.provider.openai.model, "gpt-4o-mini");
        assert!((config.provider.openai.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.agent.max_iterations, 5);
        assert!(config.agent.debug_mode);
        assert!(!config.agent.verbose);
        assert_eq!(config.tools.wiki_language, "fr");
        assert_eq!(config.tools.max_search_results, 3);
        assert_eq!(config.tools.url_timeout_secs, 20);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let mut config = Config::default();
        apply_overrides_from(
            &mut config,
            lookup(&[("TEMPERATURE", "warm"), ("MAX_ITERATIONS", "-1")]),
        );

        assert!((config.provider.openai.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.agent.max_iterations, 15);
    }

    #[test]
    fn test_serpapi_enabled_by_key() {
        let mut config = Config::default();
        apply_overrides_from(&mut config, lookup(&[("SERPAPI_API_KEY", "abc")]));

        let serp = config.provider.serpapi.expect("serpapi configured");
        assert_eq!(serp.api_key.expose_secret(), "abc");
        assert_eq!(serp.base_url, "https://serpapi.com");
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[provider.openai]\nmodel = \"gpt-4o\"\n\n[tools]\nurl_timeout_secs = 3").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.provider.openai.model, "gpt-4o");
        assert_eq!(config.tools.url_timeout_secs, 3);
    }

    #[test]
    fn test_load_json5_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ agent: { max_iterations: 7 }, // comment\n }").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.agent.max_iterations, 7);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        assert!(matches!(load_config_from_path(&path), Err(Error::Config(_))));
    }
}
