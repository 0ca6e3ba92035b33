//! Lifecycle plugin contract and the ordered plugin chain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::context::PluginExecutionContext;
use crate::error::ExtensionResult;

/// Points in the orchestrator's turn where plugins are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    BeforeLlmRequest,
    BeforeToolCall,
    AfterToolResult,
    BeforeResponse,
}

impl HookPoint {
    pub const ALL: [HookPoint; 4] = [
        HookPoint::BeforeLlmRequest,
        HookPoint::BeforeToolCall,
        HookPoint::AfterToolResult,
        HookPoint::BeforeResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforeLlmRequest => "before_llm_request",
            HookPoint::BeforeToolCall => "before_tool_call",
            HookPoint::AfterToolResult => "after_tool_result",
            HookPoint::BeforeResponse => "before_response",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the chain should do after a plugin ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOutcome {
    Continue,
    Cancel { plugin: String, reason: String },
}

impl PluginOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PluginOutcome::Cancel { .. })
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Hook points this plugin subscribes to. Defaults to all of them.
    fn hooks(&self) -> &[HookPoint] {
        &HookPoint::ALL
    }

    /// Inspect or rewrite `payload` for `point`.
    async fn on_hook(
        &self,
        point: HookPoint,
        payload: &mut Value,
        ctx: &PluginExecutionContext,
    ) -> ExtensionResult<PluginOutcome>;
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name()).finish()
    }
}

/// Run `plugins` in order for `point`, stopping at the first cancellation.
///
/// The slice order is the execution order; resolved plugin lists keep the
/// declaration order of the configuration.
pub async fn run_plugin_chain(
    plugins: &[Arc<dyn Plugin>],
    point: HookPoint,
    payload: &mut Value,
    ctx: &PluginExecutionContext,
) -> ExtensionResult<PluginOutcome> {
    for plugin in plugins {
        if !plugin.hooks().contains(&point) {
            continue;
        }
        let outcome = plugin.on_hook(point, payload, ctx).await?;
        if outcome.is_cancelled() {
            tracing::debug!(plugin = plugin.name(), hook = %point, "Plugin cancelled chain");
            return Ok(outcome);
        }
    }
    Ok(PluginOutcome::Continue)
}
