//! Per-session tool call limit.
//!
//! Counts `before_tool_call` hooks in the context cache under
//! `rate-limit/<session>` and cancels the call once the count exceeds
//! `maxToolCalls`. With `windowSecs` the counter expires and the budget
//! resets.

use async_trait::async_trait;
use capstan_core::{
    ExtensionResult, HookPoint, Plugin, PluginExecutionContext, PluginOutcome,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RateLimitConfig {
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u64,
    #[serde(default)]
    pub window_secs: Option<u64>,
}

fn default_max_tool_calls() -> u64 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            window_secs: None,
        }
    }
}

const HOOKS: [HookPoint; 1] = [HookPoint::BeforeToolCall];

#[derive(Debug)]
pub struct RateLimitPlugin {
    max_tool_calls: u64,
    window: Option<Duration>,
}

impl RateLimitPlugin {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_tool_calls: config.max_tool_calls,
            window: config.window_secs.map(Duration::from_secs),
        }
    }

    pub fn counter_key(session_id: &str) -> String {
        format!("rate-limit/{session_id}")
    }
}

#[async_trait]
impl Plugin for RateLimitPlugin {
    fn name(&self) -> &str {
        "rate-limit"
    }

    fn hooks(&self) -> &[HookPoint] {
        &HOOKS
    }

    async fn on_hook(
        &self,
        _point: HookPoint,
        _payload: &mut Value,
        ctx: &PluginExecutionContext,
    ) -> ExtensionResult<PluginOutcome> {
        let key = Self::counter_key(ctx.session_id.as_str());
        let count = ctx.storage.cache.increment(&key, 1, self.window).await?;

        if u64::try_from(count).is_ok_and(|count| count > self.max_tool_calls) {
            ctx.logger.warn(&format!(
                "session {} exceeded {} tool calls",
                ctx.session_id, self.max_tool_calls
            ));
            return Ok(PluginOutcome::Cancel {
                plugin: self.name().to_string(),
                reason: format!("tool call limit of {} reached", self.max_tool_calls),
            });
        }
        Ok(PluginOutcome::Continue)
    }
}
