//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, AgentConfig, MemoryConfig)
//! - types/provider.rs: OpenAI and SerpAPI settings
//! - types/tools.rs: Tool settings
//! - io.rs: Configuration loading
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths
//! - prompts.rs: System message presets

mod io;
mod paths;
pub mod prompts;
mod types;
mod validation;

pub use types::{AgentConfig, Config, MemoryConfig};
pub use types::provider::{OpenAiConfig, ProviderConfig, SerpApiConfig};
pub use types::tools::ToolsConfig;

pub use io::{apply_env_overrides, apply_overrides_from, load_config, load_config_from_path};
pub use paths::{config_dir, config_path, state_dir, workspace_dir};
pub use prompts::{preset_names, resolve_system_message, DEFAULT_SYSTEM_MESSAGE, SYSTEM_MESSAGES};
pub use validation::{
    is_valid_openai_key, is_valid_serpapi_key, mask_secret, validate_config,
    ConfigValidationResult, ValidationIssue,
};
