//! Agent module - LLM client, conversation memory and query routing
//!
//! - client.rs: OpenAI chat-completions client
//! - types.rs: Wire types for chat completions and tool calling
//! - memory.rs: Bounded conversation history
//! - agentic_loop.rs: Function-calling loop over the tool registry
//! - router.rs: Direct calculation vs. LLM dispatch

pub mod agentic_loop;
mod client;
pub mod memory;
mod router;
mod types;

pub use agentic_loop::{
    run_agentic_loop, ActionRecorder, AgentAction, AgentLoopInput, AgentLoopOutput, LoopCallback,
    LoopConfig, LoopOutcome, LoopTrace, NoOpCallback, MAX_ITERATIONS_MESSAGE,
};
pub use client::OpenAiClient;
pub use memory::{ConversationMemory, EntryRole, HistoryEntry};
pub use router::{is_direct_calculation, Agent, Route, Turn};
pub use types::*;
