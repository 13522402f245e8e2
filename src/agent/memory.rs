//! Conversation memory
//!
//! A bounded history of user, assistant and error entries. The system
//! message lives outside the bounded buffer so trimming never drops it.

use crate::agent::types::Message;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Role of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    User,
    Assistant,
    Error,
}

impl std::fmt::Display for EntryRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryRole::User => write!(f, "user"),
            EntryRole::Assistant => write!(f, "assistant"),
            EntryRole::Error => write!(f, "error"),
        }
    }
}

/// A single entry in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: EntryRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Error label, only set for error entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl HistoryEntry {
    fn new(role: EntryRole, content: &str, error_type: Option<String>) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::InvalidInput(
                "Message content cannot be empty".to_string(),
            ));
        }

        Ok(HistoryEntry {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            error_type,
        })
    }

    /// Convert to a chat-completions message
    pub fn to_message(&self) -> Message {
        match self.role {
            EntryRole::User => Message::user(&self.content),
            EntryRole::Assistant => Message::assistant(&self.content),
            EntryRole::Error => Message::system(format!(
                "Error: {}\n{}",
                self.error_type.as_deref().unwrap_or("Error"),
                self.content
            )),
        }
    }
}

/// Bounded conversation history
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    entries: VecDeque<HistoryEntry>,
    max_messages: usize,
    system_message: Option<String>,
}

impl ConversationMemory {
    /// Create an empty history holding at most `max_messages` entries
    pub fn new(max_messages: usize) -> Self {
        ConversationMemory {
            entries: VecDeque::new(),
            max_messages: max_messages.max(1),
            system_message: None,
        }
    }

    /// Set the system message
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.max_messages {
            self.entries.pop_front();
        }
    }

    /// Record a user message
    pub fn add_user(&mut self, content: &str) -> Result<()> {
        self.push(HistoryEntry::new(EntryRole::User, content, None)?);
        Ok(())
    }

    /// Record an assistant message
    pub fn add_assistant(&mut self, content: &str) -> Result<()> {
        self.push(HistoryEntry::new(EntryRole::Assistant, content, None)?);
        Ok(())
    }

    /// Record an error
    pub fn add_error(&mut self, error_type: &str, content: &str) -> Result<()> {
        self.push(HistoryEntry::new(
            EntryRole::Error,
            content,
            Some(error_type.to_string()),
        )?);
        Ok(())
    }

    /// Messages to send to the LLM: system message first, then history
    pub fn api_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.entries.len() + 1);

        if let Some(ref system) = self.system_message {
            messages.push(Message::system(system));
        }

        messages.extend(self.entries.iter().map(HistoryEntry::to_message));
        messages
    }

    /// Stored entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Clear all entries (the system message is kept)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
