//! Context compaction contract.
//!
//! A compaction strategy decides when the conversation history has grown too
//! large and how to shrink it. Summarisation through a model is the
//! orchestrator's business; strategies here only select what to keep.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Rough token estimate (bytes / 4, at least 1).
    pub fn estimated_tokens(&self) -> u64 {
        (self.content.len() as u64 / 4).max(1)
    }
}

/// Snapshot handed to [`CompactionStrategy::should_compact`].
#[derive(Debug, Clone, Default)]
pub struct CompactionContext {
    pub message_count: usize,
    pub estimated_tokens: u64,
    /// Context window of the active model, when known.
    pub max_context_tokens: Option<u64>,
}

impl CompactionContext {
    pub fn from_history(messages: &[Message], max_context_tokens: Option<u64>) -> Self {
        Self {
            message_count: messages.len(),
            estimated_tokens: messages.iter().map(Message::estimated_tokens).sum(),
            max_context_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionResult {
    /// History to continue with.
    pub messages: Vec<Message>,
    /// Messages removed from the history.
    pub discarded: Vec<Message>,
}

pub trait CompactionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn should_compact(&self, ctx: &CompactionContext) -> bool;

    fn compact(&self, messages: &[Message]) -> CompactionResult;
}

impl fmt::Debug for dyn CompactionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompactionStrategy")
            .field("name", &self.name())
            .finish()
    }
}
