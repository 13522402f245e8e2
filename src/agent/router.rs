//! Query router
//!
//! Sends recognisable arithmetic straight to the calculator and everything
//! else to the tool-calling loop, recording each turn in memory.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::agent::agentic_loop::{
    run_agentic_loop, ActionRecorder, AgentAction, AgentLoopInput, LoopConfig, LoopOutcome,
};
use crate::agent::client::OpenAiClient;
use crate::agent::memory::{ConversationMemory, HistoryEntry};
use crate::agent::types::Message;
use crate::config::{resolve_system_message, Config};
use crate::error::{Error, Result};
use crate::tools::expr::{CONSTANTS, FUNCTIONS};
use crate::tools::{CalculatorTool, ToolRegistry};

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:{})\s*\(", FUNCTIONS.join("|"))).expect("valid regex")
});

static NUMBER_FACTORIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?\s*!$").expect("valid regex"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z_][a-z0-9_]*").expect("valid regex"));

fn is_arithmetic_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || "+-*/%^().,!×÷".contains(c)
}

/// Whether a query can be answered by the calculator without the LLM
pub fn is_direct_calculation(input: &str) -> bool {
    let query = input.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }

    if FUNCTION_CALL.is_match(&query) || NUMBER_FACTORIAL.is_match(&query) {
        return true;
    }

    let mut has_operand = query.chars().any(|c| c.is_ascii_digit());
    for ident in IDENTIFIER.find_iter(&query) {
        let name = ident.as_str();
        if CONSTANTS.contains(&name) {
            has_operand = true;
        } else if !FUNCTIONS.contains(&name) {
            return false;
        }
    }

    // a bare list like "1, 2, 3" is a dataset, not an expression
    if query.contains(',') && !query.contains('(') {
        return false;
    }

    has_operand && IDENTIFIER.replace_all(&query, "").chars().all(is_arithmetic_char)
}

/// Which path answered a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Evaluated by the calculator without an LLM call
    Direct,
    /// Answered through the tool-calling loop
    Llm,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Direct => write!(f, "direct calculation"),
            Route::Llm => write!(f, "LLM agent"),
        }
    }
}

/// The result of processing one user message
#[derive(Debug, Clone)]
pub struct Turn {
    pub route: Route,
    pub answer: String,
    /// Tool calls and the finish recorded during this turn
    pub actions: Vec<AgentAction>,
    /// LLM round-trips (0 on the direct path)
    pub iterations: usize,
    pub outcome: Option<LoopOutcome>,
    pub elapsed: Duration,
}

/// Conversational agent: router, memory and tools
pub struct Agent {
    client: Option<OpenAiClient>,
    tools: ToolRegistry,
    calculator: CalculatorTool,
    memory: ConversationMemory,
    loop_config: LoopConfig,
    actions: Vec<AgentAction>,
}

impl Agent {
    /// Build an agent from configuration and a tool registry.
    ///
    /// Without an OpenAI key the agent still answers direct calculations;
    /// LLM-bound queries then fail with a configuration error.
    pub fn new(config: &Config, tools: ToolRegistry) -> Self {
        let client = match OpenAiClient::new(config.provider.openai.clone()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("LLM path disabled: {}", e);
                None
            }
        };

        let generation_options = client
            .as_ref()
            .map(OpenAiClient::default_options)
            .unwrap_or_default();

        let memory = ConversationMemory::new(config.memory.max_messages).with_system_message(
            resolve_system_message(config.memory.system_message.as_deref()),
        );

        Agent {
            client,
            tools,
            calculator: CalculatorTool::new(),
            memory,
            loop_config: LoopConfig::new(config.agent.max_iterations, generation_options),
            actions: Vec::new(),
        }
    }

    /// Answer one user message
    pub async fn process_message(&mut self, input: &str) -> Result<Turn> {
        let query = input.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput(
                "Message content cannot be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let turn = if is_direct_calculation(query) {
            self.direct(query, start)?
        } else {
            self.via_llm(query, start).await?
        };

        self.actions.extend(turn.actions.iter().cloned());
        info!(
            "Answered via {} in {:.2}s",
            turn.route,
            turn.elapsed.as_secs_f64()
        );
        Ok(turn)
    }

    fn direct(&mut self, query: &str, start: Instant) -> Result<Turn> {
        debug!("Direct calculation: {}", query);
        let answer = self.calculator.calculate(query).to_string();

        self.memory.add_user(query)?;
        self.memory.add_assistant(&answer)?;

        Ok(Turn {
            route: Route::Direct,
            actions: vec![
                AgentAction::Tool {
                    tool: "calculator".to_string(),
                    tool_input: query.to_string(),
                    log: "Direct calculation".to_string(),
                },
                AgentAction::Finish {
                    output: answer.clone(),
                    log: "Direct calculation".to_string(),
                },
            ],
            answer,
            iterations: 0,
            outcome: None,
            elapsed: start.elapsed(),
        })
    }

    async fn via_llm(&mut self, query: &str, start: Instant) -> Result<Turn> {
        let mut messages = self.memory.api_messages();
        messages.push(Message::user(query));
        self.memory.add_user(query)?;

        let recorder = ActionRecorder::new();
        let result = match self.client {
            Some(ref client) => {
                run_agentic_loop(AgentLoopInput {
                    messages,
                    llm_client: client,
                    tools: &self.tools,
                    config: self.loop_config.clone(),
                    callback: &recorder,
                })
                .await
            }
            None => Err(Error::Config(
                "OpenAI API key not configured (set OPENAI_API_KEY)".to_string(),
            )),
        };

        let (answer, iterations, outcome) = match result {
            Ok(output) => {
                self.memory.add_assistant(&output.response)?;
                (
                    output.response,
                    output.trace.iterations(),
                    Some(output.trace.outcome),
                )
            }
            Err(e) => {
                warn!("Agent error ({}): {}", e.kind(), e);
                self.memory.add_error(e.kind(), &e.to_string())?;
                (format!("An error occurred: {}", e), 0, None)
            }
        };

        Ok(Turn {
            route: Route::Llm,
            answer,
            actions: recorder.take(),
            iterations,
            outcome,
            elapsed: start.elapsed(),
        })
    }

    /// Clear history and recorded actions
    pub fn clear_history(&mut self) {
        self.memory.clear();
        self.actions.clear();
        self.tools.reset_all();
    }

    /// Stored history, oldest first
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.memory.entries()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// All actions recorded since the last clear
    pub fn actions(&self) -> &[AgentAction] {
        &self.actions
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Whether an LLM client is configured
    pub fn has_llm(&self) -> bool {
        self.client.is_some()
    }

    pub fn model(&self) -> Option<&str> {
        self.client.as_ref().map(OpenAiClient::model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::memory::EntryRole;
    use crate::tools::default_registry;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_agent() -> Agent {
        let config = Config::default();
        let tools = default_registry(&config).unwrap();
        Agent::new(&config, tools)
    }

    fn online_agent(server: &MockServer) -> Agent {
        let mut config = Config::default();
        config.provider.openai.api_key = SecretString::from("sk-test");
        config.provider.openai.base_url = server.uri();
        let tools = default_registry(&config).unwrap();
        Agent::new(&config, tools)
    }

    fn text_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
    }

    #[test]
    fn test_direct_detection() {
        for query in ["2+2", "sqrt(16)", "5!", "2 ^ 10", "pi * 3**2", "round(2.567, 2)", "(1 + 2) * 3", "Log10(100)"] {
            assert!(is_direct_calculation(query), "{query} should be direct");
        }
        for query in ["", "what is 2+2?", "Calculate mean of [1, 2, 3]", "1, 2, 3", "hello", "sin", "x + 1"] {
            assert!(!is_direct_calculation(query), "{query} should go to the LLM");
        }
    }

    #[tokio::test]
    async fn test_direct_path_without_llm() {
        let mut agent = offline_agent();
        assert!(!agent.has_llm());

        let turn = agent.process_message("  2+2 ").await.unwrap();
        assert_eq!(turn.route, Route::Direct);
        assert_eq!(turn.answer, "4");
        assert_eq!(turn.iterations, 0);

        let history: Vec<_> = agent.history().collect();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "2+2");
        assert_eq!(history[1].content, "4");
        assert_eq!(agent.actions().len(), 2);
    }

    #[tokio::test]
    async fn test_direct_path_error_text() {
        let mut agent = offline_agent();
        let turn = agent.process_message("1/0").await.unwrap();
        assert_eq!(turn.answer, "Error: Division by zero");
    }

    #[tokio::test]
    async fn test_missing_key_records_error() {
        let mut agent = offline_agent();
        let turn = agent.process_message("Who wrote Hamlet?").await.unwrap();

        assert_eq!(turn.route, Route::Llm);
        assert_eq!(
            turn.answer,
            "An error occurred: Configuration error: OpenAI API key not configured (set OPENAI_API_KEY)"
        );

        let history: Vec<_> = agent.history().collect();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, EntryRole::Error);
        assert_eq!(history[1].error_type.as_deref(), Some("ConfigurationError"));
    }

    #[tokio::test]
    async fn test_llm_path_uses_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Who wrote Hamlet?"))
            .and(body_string_contains("And Macbeth?"))
            .respond_with(text_reply("Also Shakespeare."))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(text_reply("William Shakespeare."))
            .mount(&server)
            .await;

        let mut agent = online_agent(&server);
        let first = agent.process_message("Who wrote Hamlet?").await.unwrap();
        assert_eq!(first.answer, "William Shakespeare.");
        assert_eq!(first.outcome, Some(LoopOutcome::Completed));

        let second = agent.process_message("And Macbeth?").await.unwrap();
        assert_eq!(second.answer, "Also Shakespeare.");
        assert_eq!(agent.memory().len(), 4);

        agent.clear_history();
        assert!(agent.memory().is_empty());
        assert!(agent.actions().is_empty());
        assert!(agent.memory().system_message().is_some());
    }

    #[tokio::test]
    async fn test_api_failure_rendered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut agent = online_agent(&server);
        let turn = agent.process_message("Tell me a joke").await.unwrap();
        assert_eq!(turn.answer, "An error occurred: Unauthorized: Invalid OpenAI API key");

        let last = agent.history().last().unwrap();
        assert_eq!(last.error_type.as_deref(), Some("AuthenticationError"));
    }

    #[tokio::test]
    async fn test_error_entry_sent_with_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Error: AuthenticationError"))
            .respond_with(text_reply("The key works again."))
            .mount(&server)
            .await;

        let mut agent = online_agent(&server);
        let failed = agent.process_message("Tell me a joke").await.unwrap();
        assert!(failed.answer.starts_with("An error occurred: "));

        let retried = agent.process_message("Try again").await.unwrap();
        assert_eq!(retried.answer, "The key works again.");
        assert_eq!(retried.outcome, Some(LoopOutcome::Completed));
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let mut agent = offline_agent();
        assert!(matches!(
            agent.process_message("   ").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
