//! Core tool trait and result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{FunctionDefinition, ToolDefinition};
use crate::error::{Error, Result};

/// A tool that can be called by the LLM
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON Schema for tool parameters.
    ///
    /// Every built-in tool takes a single `query` string.
    fn parameters_schema(&self) -> Value {
        query_schema("The input for this tool")
    }

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value) -> Result<ToolResult>;

    /// Whether the tool's output is the final answer when the LLM calls it
    fn returns_direct(&self) -> bool {
        false
    }

    /// Drop any state kept between calls
    fn reset(&self) {}

    /// Convert to a chat-completions tool definition
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

/// Schema for a tool taking one `query` string
pub fn query_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

/// Extract the `query` argument.
///
/// A bare JSON string is accepted too, since some models send the input
/// without wrapping it in an object.
pub fn query_arg(args: &Value) -> Result<&str> {
    args.get("query")
        .and_then(|v| v.as_str())
        .or_else(|| args.as_str())
        .ok_or_else(|| Error::InvalidInput("Missing 'query' parameter".to_string()))
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Result content (for successful execution)
    pub content: Option<String>,
    /// Error message (for failed execution)
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// Rendered for the LLM; failures are prefixed with `Error: `
impl std::fmt::Display for ToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.success {
            write!(f, "{}", self.content.as_deref().unwrap_or_default())
        } else {
            write!(f, "Error: {}", self.error.as_deref().unwrap_or_default())
        }
    }
}

/// A tool call request from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments as JSON
    pub arguments: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_rendering() {
        assert_eq!(ToolResult::success("4").to_string(), "4");
        assert_eq!(ToolResult::failure("boom").to_string(), "Error: boom");
    }

    #[test]
    fn test_query_arg() {
        let args = serde_json::json!({"query": "rust"});
        assert_eq!(query_arg(&args).unwrap(), "rust");
        assert_eq!(query_arg(&serde_json::json!("bare")).unwrap(), "bare");
        assert!(query_arg(&serde_json::json!({})).is_err());
    }
}
