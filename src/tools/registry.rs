//! Tool registry - manages available tools for the agent

use std::collections::HashMap;

use tracing::debug;

use crate::agent::ToolDefinition;
use crate::error::Result;

use super::traits::{Tool, ToolCall, ToolResult};

/// Registry of available tools, keyed by unique name
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_some() {
            debug!("Replaced existing tool '{}'", name);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => Ok(ToolResult::failure(format!("Unknown tool: {}", call.name))),
        }
    }

    /// Whether the named tool returns its output directly
    pub fn returns_direct(&self, name: &str) -> bool {
        self.get(name).is_some_and(|t| t.returns_direct())
    }

    /// Reset every tool's per-conversation state
    pub fn reset_all(&self) {
        for tool in self.tools.values() {
            tool.reset();
        }
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoTool {
        label: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the query"
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult> {
            Ok(ToolResult::success(self.label))
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: serde_json::json!({"query": "x"}),
        }
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { label: "first" });
        registry.register(EchoTool { label: "second" });

        assert_eq!(registry.count(), 1);
        let result = registry.execute(&call("echo")).await.unwrap();
        assert_eq!(result.to_string(), "second");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute(&call("missing")).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.to_string(), "Error: Unknown tool: missing");
    }

    #[test]
    fn test_definitions_use_query_schema() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { label: "x" });

        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].tool_type, "function");
        assert_eq!(defs[0].function.parameters["required"][0], "query");
        assert!(!registry.returns_direct("echo"));
    }

    struct CountingTool {
        resets: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "Counts resets"
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult> {
            Ok(ToolResult::success("ok"))
        }

        fn reset(&self) {
            self.resets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_reset_all_reaches_every_tool() {
        let resets = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { label: "x" });
        registry.register(CountingTool {
            resets: resets.clone(),
        });

        registry.reset_all();
        registry.reset_all();
        assert_eq!(resets.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
