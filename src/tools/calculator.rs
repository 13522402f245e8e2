//! Calculator tool
//!
//! Evaluates a single arithmetic expression. Its output is returned to the
//! user as-is when the model calls it.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::expr::evaluate;
use super::traits::{query_arg, query_schema, Tool, ToolResult};
use crate::error::Result;

/// Built-in tool: arithmetic calculator
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        CalculatorTool
    }

    /// Evaluate an expression into a tool result
    pub fn calculate(&self, expression: &str) -> ToolResult {
        match evaluate(expression) {
            Ok(value) => ToolResult::success(value.to_string()),
            Err(e) => {
                debug!("Calculation failed for {:?}: {}", expression, e);
                ToolResult::failure(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Mathematical calculator for SINGLE EXPRESSIONS ONLY. No datasets or sequences.\n\
         Supports: +, -, *, /, %, ^ or ** (power), ! (factorial), constants pi and e, \
         functions abs, round, pow, sqrt, sin, cos, tan, factorial, log, log10, exp, floor, ceil, \
         and interest: compound(principal, rate, time), simple(principal, rate, time).\n\
         Examples: '2 + 2', 'compound(1000, 5, 3)', '23 * 36 - (4^7)'.\n\
         Do not use for '[1, 2, 3]' or statistics (use data_analysis), web searches \
         (use web_search) or 'what is' questions (use wikipedia)."
    }

    fn parameters_schema(&self) -> Value {
        query_schema("The mathematical expression to evaluate (e.g. '2 + 2', 'pi * 3^2')")
    }

    fn returns_direct(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let expression = query_arg(&args)?;
        Ok(self.calculate(expression))
    }
}
