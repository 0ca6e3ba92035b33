//! Compaction strategies: `noop` and `sliding-window`.

use capstan_core::{CompactionContext, CompactionResult, CompactionStrategy, Message, Role};
use capstan_resolver::{CompactionFactory, FactoryError, FactoryResult, compaction_factory};
use serde::Deserialize;
use std::sync::Arc;

/// Never compacts.
#[derive(Debug, Default)]
pub struct NoopCompaction;

impl CompactionStrategy for NoopCompaction {
    fn name(&self) -> &str {
        "noop"
    }

    fn should_compact(&self, _ctx: &CompactionContext) -> bool {
        false
    }

    fn compact(&self, messages: &[Message]) -> CompactionResult {
        CompactionResult {
            messages: messages.to_vec(),
            discarded: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SlidingWindowConfig {
    #[serde(default = "default_keep_last")]
    pub keep_last: usize,
    #[serde(default = "default_trigger_messages")]
    pub trigger_messages: usize,
}

fn default_keep_last() -> usize {
    20
}

fn default_trigger_messages() -> usize {
    40
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            keep_last: default_keep_last(),
            trigger_messages: default_trigger_messages(),
        }
    }
}

/// Keeps every system message plus the newest `keep_last` others.
///
/// Triggers when the history exceeds `trigger_messages`, or when the
/// estimated token count exceeds the model's context window.
#[derive(Debug)]
pub struct SlidingWindowCompaction {
    keep_last: usize,
    trigger_messages: usize,
}

impl SlidingWindowCompaction {
    pub fn new(config: SlidingWindowConfig) -> Result<Self, FactoryError> {
        if config.keep_last == 0 {
            return Err(FactoryError::msg("keepLast must be at least 1"));
        }
        if config.trigger_messages < config.keep_last {
            return Err(FactoryError::msg(format!(
                "triggerMessages ({}) must not be below keepLast ({})",
                config.trigger_messages, config.keep_last
            )));
        }
        Ok(Self {
            keep_last: config.keep_last,
            trigger_messages: config.trigger_messages,
        })
    }
}

impl CompactionStrategy for SlidingWindowCompaction {
    fn name(&self) -> &str {
        "sliding-window"
    }

    fn should_compact(&self, ctx: &CompactionContext) -> bool {
        ctx.message_count > self.trigger_messages
            || ctx
                .max_context_tokens
                .is_some_and(|max| ctx.estimated_tokens > max)
    }

    fn compact(&self, messages: &[Message]) -> CompactionResult {
        let conversational = messages.iter().filter(|m| m.role != Role::System).count();
        let mut to_drop = conversational.saturating_sub(self.keep_last);

        let mut result = CompactionResult::default();
        for message in messages {
            if message.role != Role::System && to_drop > 0 {
                to_drop -= 1;
                result.discarded.push(message.clone());
            } else {
                result.messages.push(message.clone());
            }
        }
        tracing::debug!(
            kept = result.messages.len(),
            discarded = result.discarded.len(),
            "Compacted history"
        );
        result
    }
}

pub fn noop_compaction_factory() -> Arc<dyn CompactionFactory> {
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct NoopConfig {}

    compaction_factory(|_: NoopConfig| -> FactoryResult<Arc<dyn CompactionStrategy>> {
        Ok(Arc::new(NoopCompaction))
    })
}

/// `sliding-window`: `{ keepLast?, triggerMessages? }`.
pub fn sliding_window_compaction_factory() -> Arc<dyn CompactionFactory> {
    compaction_factory(
        |config: SlidingWindowConfig| -> FactoryResult<Arc<dyn CompactionStrategy>> {
            Ok(Arc::new(SlidingWindowCompaction::new(config)?))
        },
    )
}
