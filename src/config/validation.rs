//! Configuration validation
//!
//! Validates configuration and reports issues.

use regex::Regex;
use secrecy::ExposeSecret;
use std::sync::LazyLock;

use super::types::Config;

static OPENAI_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sk-(?:proj-)?[A-Za-z0-9_-]{32,}$").expect("valid regex"));

static SERPAPI_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{32,}$").expect("valid regex"));

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_provider_config(config, result);
    result = validate_agent_config(config, result);
    result = validate_tools_config(config, result);

    result
}

/// Check an OpenAI key's shape
pub fn is_valid_openai_key(key: &str) -> bool {
    OPENAI_KEY_PATTERN.is_match(key)
}

/// Check a SerpAPI key's shape
pub fn is_valid_serpapi_key(key: &str) -> bool {
    SERPAPI_KEY_PATTERN.is_match(key)
}

/// Mask a secret for display, keeping the first 8 and last 4 characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let openai = &config.provider.openai;
    let key = openai.api_key.expose_secret();

    if key.is_empty() {
        result = result.with_warning(
            ValidationIssue::new(
                "provider.openai.api_key",
                "OpenAI API key is not configured. Only direct calculations will work.",
            )
            .with_suggestion("Set the OPENAI_API_KEY environment variable"),
        );
    } else if !is_valid_openai_key(key) {
        result = result.with_warning(ValidationIssue::new(
            "provider.openai.api_key",
            "OpenAI API key has an unexpected format",
        ));
    }

    if !(0.0..=2.0).contains(&openai.temperature) {
        result = result.with_error(
            ValidationIssue::new(
                "provider.openai.temperature",
                format!("Temperature {} is out of range", openai.temperature),
            )
            .with_suggestion("Use a value between 0.0 and 2.0"),
        );
    }

    if openai.model.trim().is_empty() {
        result = result.with_error(ValidationIssue::new(
            "provider.openai.model",
            "Model name must not be empty",
        ));
    }

    match &config.provider.serpapi {
        None => {
            result = result.with_warning(
                ValidationIssue::new(
                    "provider.serpapi",
                    "SerpAPI key not configured. Web search functionality will be limited.",
                )
                .with_suggestion("Set the SERPAPI_API_KEY environment variable"),
            );
        }
        Some(serp) if !is_valid_serpapi_key(serp.api_key.expose_secret()) => {
            result = result.with_warning(ValidationIssue::new(
                "provider.serpapi.api_key",
                "SerpAPI key has an unexpected format",
            ));
        }
        Some(_) => {}
    }

    result
}

fn validate_agent_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.agent.max_iterations == 0 {
        result = result.with_error(
            ValidationIssue::new("agent.max_iterations", "Must be at least 1")
                .with_suggestion("Set MAX_ITERATIONS to a positive number"),
        );
    }

    if config.memory.max_messages == 0 {
        result = result.with_error(
            ValidationIssue::new("memory.max_messages", "Must be at least 1")
                .with_suggestion("Pass --max-history with a positive number"),
        );
    }

    result
}

fn validate_tools_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let tools = &config.tools;

    if !(1..=10).contains(&tools.max_search_results) {
        result = result.with_error(ValidationIssue::new(
            "tools.max_search_results",
            "Must be between 1 and 10",
        ));
    }

    if tools.url_timeout_secs == 0 {
        result = result.with_error(ValidationIssue::new("tools.url_timeout_secs", "Must be at least 1"));
    }

    if tools.code_timeout_secs == 0 {
        result = result.with_error(ValidationIssue::new("tools.code_timeout_secs", "Must be at least 1"));
    }

    if tools.wiki_language.len() < 2
        || tools.wiki_language.len() > 3
        || !tools.wiki_language.chars().all(|c| c.is_ascii_lowercase())
    {
        result = result.with_error(ValidationIssue::new(
            "tools.wiki_language",
            format!("Invalid language code: {}", tools.wiki_language),
        ));
    }

    result
}
