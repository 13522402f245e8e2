//! Tools module - Modular tool system for agent capabilities
//!
//! Each tool is a self-contained module that implements the `Tool` trait.
//! Tools are registered into a `ToolRegistry` and made available to the LLM
//! for function calling. Every tool takes a single `query` string.
//!
//! ## Built-in Tools
//!
//! - **calculator**: Arithmetic expressions (also used for direct answers)
//! - **web_search**: Google results via SerpAPI (requires API key)
//! - **wikipedia**: Wikipedia search and summaries
//! - **url_fetch**: Fetch a web page as plain text
//! - **python_repl**: Run Python code in a subprocess
//! - **data_analysis**: Descriptive statistics over datasets
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `src/tools/` (e.g., `my_tool.rs`)
//! 2. Implement the `Tool` trait
//! 3. Add `mod my_tool;` and `pub use` in this file
//! 4. Register it in `default_registry`

mod traits;
mod registry;
pub mod expr;
pub mod validators;
mod calculator;
mod web_search;
mod wikipedia;
mod url_fetch;
mod python_repl;
mod data_analysis;

use secrecy::ExposeSecret;
use tracing::warn;

use crate::config::Config;
use crate::error::Result;

// Core trait and types
pub use traits::{query_arg, query_schema, Tool, ToolCall, ToolResult};

// Registry
pub use registry::ToolRegistry;

// Built-in tools
pub use calculator::CalculatorTool;
pub use web_search::{SearchRequest, WebSearchTool};
pub use wikipedia::{WikiRequest, WikipediaTool};
pub use url_fetch::{clean_html, UrlFetchTool};
pub use python_repl::{prepare_code, PythonReplTool};
pub use data_analysis::{analyze, DataAnalysisTool, Stats};

/// Build the registry of built-in tools for a configuration.
///
/// Web search is only registered when a non-empty SerpAPI key is configured.
pub fn default_registry(config: &Config) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(CalculatorTool::new());
    registry.register(DataAnalysisTool::new());
    registry.register(WikipediaTool::new(&config.tools)?);
    registry.register(UrlFetchTool::new(&config.tools)?);
    registry.register(PythonReplTool::new(&config.tools));

    match config.provider.serpapi {
        Some(ref serp) if !serp.api_key.expose_secret().trim().is_empty() => {
            registry.register(WebSearchTool::new(serp.clone(), config.tools.max_search_results)?);
        }
        _ => warn!("SerpAPI key not configured. Web search functionality will be limited."),
    }

    Ok(registry)
}
