//! # toolagent
//!
//! A command-line assistant that answers arithmetic directly and hands
//! everything else to an OpenAI tool-calling loop.
//!
//! ## Features
//!
//! - **Direct path:** `2+2`, `sqrt(16)` and `5!` never reach the LLM
//! - **Tools:** web search (SerpAPI), Wikipedia, URL fetch, Python, data analysis
//! - **Bounded memory:** conversation history trimmed oldest-first

pub mod agent;
pub mod config;
pub mod error;
pub mod format;
pub mod tools;

pub use agent::Agent;
pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
