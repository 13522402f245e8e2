//! Function-calling loop engine.
//!
//! Calls the LLM with the registered tools, executes the tool calls it asks
//! for, feeds the results back and repeats until the model answers, a
//! return-direct tool produces the answer, or the iteration cap is hit.

use crate::agent::client::OpenAiClient;
use crate::agent::types::*;
use crate::error::Result;
use crate::tools::{ToolCall, ToolRegistry};

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answer returned when the iteration cap is reached
pub const MAX_ITERATIONS_MESSAGE: &str =
    "Agent stopped after reaching the maximum number of iterations.";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Limits and options for the loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum LLM round-trips before the loop is stopped.
    pub max_iterations: u32,
    /// LLM generation options (temperature, max_tokens).
    pub generation_options: GenerationOptions,
    /// Text returned when the model replies with neither content nor tool calls.
    pub fallback_message: String,
}

impl LoopConfig {
    pub fn new(max_iterations: u32, generation_options: GenerationOptions) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            generation_options,
            fallback_message: "I couldn't produce an answer. Please try rephrasing your request."
                .into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured trace types
// ---------------------------------------------------------------------------

/// A tool call and its observation.
#[derive(Debug, Clone)]
pub struct ToolAction {
    pub tool_name: String,
    /// Raw JSON arguments from the model
    pub arguments: String,
    /// The `query` argument, or the raw arguments when absent
    pub input: String,
    /// Text the model produced alongside the call
    pub thought: String,
    pub observation: ToolObservation,
}

/// The result of executing a single tool call.
#[derive(Debug, Clone)]
pub struct ToolObservation {
    pub success: bool,
    pub content: String,
    pub duration_ms: u64,
}

/// One iteration of the loop.
#[derive(Debug, Clone)]
pub struct LoopStep {
    pub iteration: u32,
    /// Text content produced by the LLM in this iteration (may be empty).
    pub thought: String,
    /// Tool calls executed in this iteration.
    pub actions: Vec<ToolAction>,
    pub finish_reason: String,
}

/// Full trace of a loop execution.
#[derive(Debug, Clone)]
pub struct LoopTrace {
    pub steps: Vec<LoopStep>,
    pub outcome: LoopOutcome,
    pub total_duration_ms: u64,
}

impl LoopTrace {
    /// Number of LLM round-trips made
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }
}

/// How the loop finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered without requesting tools.
    Completed,
    /// A return-direct tool produced the answer.
    ReturnedDirect(String),
    /// Hit `max_iterations`.
    MaxIterationsExceeded,
    /// The model returned neither content nor tool calls.
    EmptyResponse,
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Hooks into loop events.
#[async_trait]
pub trait LoopCallback: Send + Sync {
    /// Called at the start of each iteration, before the LLM call.
    async fn on_iteration_start(&self, _iteration: u32) {}
    /// Called after each individual tool has been executed.
    async fn on_tool_executed(&self, _action: &ToolAction) {}
    /// Called at the end of each iteration.
    async fn on_iteration_end(&self, _step: &LoopStep) {}
    /// Called once after the loop terminates with the final answer.
    async fn on_loop_complete(&self, _response: &str, _trace: &LoopTrace) {}
}

/// Default no-op callback.
pub struct NoOpCallback;

#[async_trait]
impl LoopCallback for NoOpCallback {}

/// An agent action as shown by `/thinking`.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    /// A tool invocation
    Tool {
        tool: String,
        tool_input: String,
        log: String,
    },
    /// The final answer
    Finish { output: String, log: String },
}

impl std::fmt::Display for AgentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentAction::Tool { tool, tool_input, .. } => {
                write!(f, "Tool: {}\nInput: {}", tool, tool_input)
            }
            AgentAction::Finish { output, .. } => write!(f, "Final answer: {}", output),
        }
    }
}

/// Callback that records tool calls and the finish.
#[derive(Debug, Default)]
pub struct ActionRecorder {
    actions: Mutex<Vec<AgentAction>>,
}

impl ActionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded actions, leaving the recorder empty
    pub fn take(&self) -> Vec<AgentAction> {
        self.actions
            .lock()
            .map(|mut a| std::mem::take(&mut *a))
            .unwrap_or_default()
    }

    fn push(&self, action: AgentAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }
}

#[async_trait]
impl LoopCallback for ActionRecorder {
    async fn on_tool_executed(&self, action: &ToolAction) {
        let log = if action.thought.is_empty() {
            format!("Invoking: `{}` with `{}`", action.tool_name, action.input)
        } else {
            action.thought.clone()
        };
        self.push(AgentAction::Tool {
            tool: action.tool_name.clone(),
            tool_input: action.input.clone(),
            log,
        });
    }

    async fn on_loop_complete(&self, response: &str, trace: &LoopTrace) {
        self.push(AgentAction::Finish {
            output: response.to_string(),
            log: format!("{:?} after {} iteration(s)", trace.outcome, trace.iterations()),
        });
    }
}

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Everything the loop needs to run.
pub struct AgentLoopInput<'a, C: LoopCallback> {
    /// The conversation messages (system + history + new user message).
    pub messages: Vec<Message>,
    /// LLM client to call.
    pub llm_client: &'a OpenAiClient,
    /// Tool registry to execute tools against.
    pub tools: &'a ToolRegistry,
    /// Loop configuration.
    pub config: LoopConfig,
    /// Event callback.
    pub callback: &'a C,
}

/// The result of running the loop.
#[derive(Debug)]
pub struct AgentLoopOutput {
    /// The final answer text.
    pub response: String,
    /// Structured trace of the full execution.
    pub trace: LoopTrace,
    /// The full messages vector at the end (including tool results).
    pub final_messages: Vec<Message>,
    /// Accumulated token usage across all iterations.
    pub total_usage: Usage,
}

// ---------------------------------------------------------------------------
// Core loop implementation
// ---------------------------------------------------------------------------

/// Run the function-calling loop.
///
/// LLM request failures are returned as errors; tool failures are fed back
/// to the model as `Error: ...` tool messages.
pub async fn run_agentic_loop<C: LoopCallback>(
    input: AgentLoopInput<'_, C>,
) -> Result<AgentLoopOutput> {
    let AgentLoopInput {
        mut messages,
        llm_client,
        tools,
        config,
        callback,
    } = input;

    let loop_start = Instant::now();
    let tool_definitions = tools.definitions();
    let mut steps: Vec<LoopStep> = Vec::new();
    let mut total_usage = Usage::default();
    let mut finished: Option<(String, LoopOutcome)> = None;

    for iteration in 1..=config.max_iterations {
        info!("Agent loop iteration {}/{}", iteration, config.max_iterations);
        callback.on_iteration_start(iteration).await;

        let response = if tool_definitions.is_empty() {
            llm_client
                .chat(messages.clone(), config.generation_options.clone())
                .await?
        } else {
            llm_client
                .chat_with_tools(
                    messages.clone(),
                    tool_definitions.clone(),
                    config.generation_options.clone(),
                )
                .await?
        };

        if let Some(ref usage) = response.usage {
            accumulate_usage(&mut total_usage, usage);
        }

        let choice = match response.choices.into_iter().next() {
            Some(c) => c,
            None => {
                warn!("LLM returned no choices");
                finished = Some((config.fallback_message.clone(), LoopOutcome::EmptyResponse));
                break;
            }
        };

        let finish_reason = choice.finish_reason.clone().unwrap_or_else(|| "unknown".into());
        let thought = choice.message.content.trim().to_string();
        let tool_calls = choice.message.requested_tool_calls().to_vec();

        debug!(
            "LLM finish_reason: {}, has_content: {}, tool_calls: {}",
            finish_reason,
            !thought.is_empty(),
            tool_calls.len()
        );

        // --- No tool calls: content is the final answer ---------------------
        if tool_calls.is_empty() {
            let step = LoopStep {
                iteration,
                thought: thought.clone(),
                actions: vec![],
                finish_reason,
            };
            callback.on_iteration_end(&step).await;
            steps.push(step);

            finished = Some(if thought.is_empty() {
                warn!("LLM returned an empty response");
                (config.fallback_message.clone(), LoopOutcome::EmptyResponse)
            } else {
                (thought, LoopOutcome::Completed)
            });
            break;
        }

        // --- Tool calls ------------------------------------------------------
        messages.push(choice.message.clone());

        let mut actions = Vec::with_capacity(tool_calls.len());
        let mut direct_answer: Option<(String, String)> = None;

        for tc in &tool_calls {
            let tool_name = &tc.function.name;

            let args: serde_json::Value = match serde_json::from_str(&tc.function.arguments) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Failed to parse tool arguments for {}: {}", tool_name, e);
                    serde_json::json!({})
                }
            };
            let tool_input = args
                .get("query")
                .and_then(|q| q.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| tc.function.arguments.clone());

            info!("Executing tool: {}", tool_name);
            debug!("Tool {} arguments: {}", tool_name, tc.function.arguments);

            let call = ToolCall {
                id: tc.id.clone(),
                name: tool_name.clone(),
                arguments: args,
            };

            let tool_start = Instant::now();
            let (success, content) = match tools.execute(&call).await {
                Ok(r) => (r.success, r.to_string()),
                Err(e) => (false, format!("Tool error: {}", e)),
            };
            let duration_ms = tool_start.elapsed().as_millis() as u64;

            if success {
                debug!("Tool {} result: {} chars", tool_name, content.len());
            } else {
                warn!("Tool {} failed: {}", tool_name, content);
            }

            messages.push(Message::tool(&tc.id, &content));

            if tools.returns_direct(tool_name) {
                direct_answer = Some((tool_name.clone(), content.clone()));
            }

            let action = ToolAction {
                tool_name: tool_name.clone(),
                arguments: tc.function.arguments.clone(),
                input: tool_input,
                thought: thought.clone(),
                observation: ToolObservation {
                    success,
                    content,
                    duration_ms,
                },
            };
            callback.on_tool_executed(&action).await;
            actions.push(action);
        }

        let step = LoopStep {
            iteration,
            thought,
            actions,
            finish_reason,
        };
        callback.on_iteration_end(&step).await;
        steps.push(step);

        if let Some((tool, answer)) = direct_answer {
            info!("Tool {} returns directly, ending loop", tool);
            finished = Some((answer, LoopOutcome::ReturnedDirect(tool)));
            break;
        }
    }

    let (response, outcome) = finished.unwrap_or_else(|| {
        warn!("Agent loop hit the iteration limit ({})", config.max_iterations);
        (
            MAX_ITERATIONS_MESSAGE.to_string(),
            LoopOutcome::MaxIterationsExceeded,
        )
    });

    let trace = LoopTrace {
        steps,
        outcome,
        total_duration_ms: loop_start.elapsed().as_millis() as u64,
    };

    callback.on_loop_complete(&response, &trace).await;

    info!(
        "Agent loop finished: outcome={:?}, iterations={}, duration={}ms, tokens={}",
        trace.outcome,
        trace.iterations(),
        trace.total_duration_ms,
        total_usage.total_tokens,
    );

    Ok(AgentLoopOutput {
        response,
        trace,
        final_messages: messages,
        total_usage,
    })
}

/// Sum token usage from one response into an accumulator.
fn accumulate_usage(total: &mut Usage, delta: &Usage) {
    total.prompt_tokens += delta.prompt_tokens;
    total.completion_tokens += delta.completion_tokens;
    total.total_tokens += delta.total_tokens;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
