//! Minimal orchestrator: owns resolved services and the context builder,
//! and drives tool calls through the plugin chain.

use capstan_core::{
    AgentHandle, AgentRef, AgentServices, CompactionContext, CompactionResult, ExtensionError,
    HookPoint, Message, PluginOutcome, SessionId, run_plugin_chain,
};
use capstan_resolver::{
    AgentConfig, Bootstrapped, BundleLoader, CapstanResult, ConfigDocument,
    ExecutionContextBuilder, ResolvedServices, bootstrap,
};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Unknown tool '{name}'. Available: {}", available.join(", "))]
    UnknownTool { name: String, available: Vec<String> },

    #[error("Plugin '{plugin}' cancelled {hook}: {reason}")]
    Cancelled {
        plugin: String,
        hook: HookPoint,
        reason: String,
    },

    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

pub struct AgentRuntime {
    id: String,
    services: ResolvedServices,
    passthrough: Map<String, Value>,
    contexts: ExecutionContextBuilder,
}

impl AgentRuntime {
    /// Build the runtime around already resolved services.
    ///
    /// The context builder is created inside `Arc::new_cyclic`, so the
    /// `AgentRef` it hands out points back at this runtime without owning it.
    pub fn new(
        id: impl Into<String>,
        config: &AgentConfig,
        services: ResolvedServices,
        agent_services: AgentServices,
    ) -> Arc<Self> {
        let id = id.into();
        Arc::new_cyclic(|weak: &Weak<AgentRuntime>| {
            let handle: Weak<dyn AgentHandle> = weak.clone();
            let agent = AgentRef::new(id.as_str(), handle);
            let contexts = ExecutionContextBuilder::new(&services, agent_services, agent);
            Self {
                id,
                services,
                passthrough: config.passthrough.clone(),
                contexts,
            }
        })
    }

    pub fn from_bootstrapped(
        id: impl Into<String>,
        ready: Bootstrapped,
        agent_services: AgentServices,
    ) -> Arc<Self> {
        Self::new(id, &ready.config, ready.services, agent_services)
    }

    /// Load `identifier`, resolve `document` against it and start a runtime.
    pub async fn start(
        id: impl Into<String>,
        loader: &BundleLoader,
        identifier: &str,
        document: &ConfigDocument,
        agent_services: AgentServices,
    ) -> CapstanResult<Arc<Self>> {
        let ready = bootstrap(loader, identifier, document).await?;
        Ok(Self::from_bootstrapped(id, ready, agent_services))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn services(&self) -> &ResolvedServices {
        &self.services
    }

    pub fn contexts(&self) -> &ExecutionContextBuilder {
        &self.contexts
    }

    /// Run the plugin chain for `point` with a fresh plugin context.
    pub async fn run_hook(
        &self,
        point: HookPoint,
        session_id: &SessionId,
        user_id: Option<&str>,
        payload: &mut Value,
    ) -> RuntimeResult<()> {
        let ctx = self
            .contexts
            .build_plugin_context(session_id.clone(), user_id.map(str::to_string));
        match run_plugin_chain(&self.services.plugins, point, payload, &ctx).await? {
            PluginOutcome::Continue => Ok(()),
            PluginOutcome::Cancel { plugin, reason } => Err(RuntimeError::Cancelled {
                plugin,
                hook: point,
                reason,
            }),
        }
    }

    /// Invoke `name` with `input`, wrapped in `before_tool_call` and
    /// `after_tool_result` hooks. Plugins may rewrite the input and output.
    pub async fn call_tool(
        &self,
        session_id: &SessionId,
        user_id: Option<&str>,
        name: &str,
        input: Value,
    ) -> RuntimeResult<Value> {
        let tool = self
            .services
            .find_tool(name)
            .ok_or_else(|| RuntimeError::UnknownTool {
                name: name.to_string(),
                available: self.services.tool_names(),
            })?
            .clone();

        let span = tracing::info_span!("tool_call", agent = %self.id, tool = name, session = %session_id);
        async move {
            let mut request = json!({ "tool": name, "input": input });
            self.run_hook(HookPoint::BeforeToolCall, session_id, user_id, &mut request)
                .await?;
            let input = request.get_mut("input").map(Value::take).unwrap_or(Value::Null);

            let ctx = self.contexts.build_tool_context();
            let output = tool.execute(input, &ctx).await.inspect_err(|err| {
                tracing::warn!(error = %err, "Tool call failed");
            })?;

            let mut result = json!({ "tool": name, "output": output });
            self.run_hook(HookPoint::AfterToolResult, session_id, user_id, &mut result)
                .await?;
            tracing::debug!("Tool call completed");
            let output = result.get_mut("output").map(Value::take).unwrap_or(Value::Null);
            Ok::<_, RuntimeError>(output)
        }
        .instrument(span)
        .await
    }

    /// Compact `history` when the resolved strategy asks for it.
    pub fn compact_history(
        &self,
        history: &[Message],
        max_context_tokens: Option<u64>,
    ) -> Option<CompactionResult> {
        let strategy = &self.services.compaction;
        let ctx = CompactionContext::from_history(history, max_context_tokens);
        if !strategy.should_compact(&ctx) {
            return None;
        }
        let result = strategy.compact(history);
        tracing::info!(
            agent = %self.id,
            strategy = strategy.name(),
            discarded = result.discarded.len(),
            "Compacted conversation history"
        );
        Some(result)
    }
}

impl AgentHandle for AgentRuntime {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn config_section(&self, key: &str) -> Option<Value> {
        self.passthrough.get(key).cloned()
    }

    fn tool_names(&self) -> Vec<String> {
        self.services.tool_names()
    }
}

impl fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("id", &self.id)
            .field("services", &self.services)
            .field("passthrough", &self.passthrough.keys().collect::<Vec<_>>())
            .finish()
    }
}
