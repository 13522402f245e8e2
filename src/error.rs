//! Error types for toolagent

use thiserror::Error;

/// Result type alias using toolagent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for toolagent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// OpenAI API error
    #[error("OpenAI API error: {0}")]
    OpenAi(String),

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Short label used when an error is recorded in conversation history
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "ConfigurationError",
            Error::OpenAi(_) => "APIError",
            Error::Tool(_) => "ToolError",
            Error::Http(_) => "HTTPError",
            Error::Json(_) => "JSONError",
            Error::Io(_) => "IOError",
            Error::InvalidInput(_) => "ValidationError",
            Error::Unauthorized(_) => "AuthenticationError",
            Error::RateLimit(_) => "RateLimitError",
            Error::Timeout(_) => "TimeoutError",
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
