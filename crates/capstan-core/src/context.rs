//! Execution contexts handed to extensions at invocation time.
//!
//! Contexts are built by the orchestrator's context builder immediately
//! before each tool or plugin call. They are never available to factories,
//! which is what keeps extension construction independent of the
//! orchestrator.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{ExtensionError, ExtensionResult};
use crate::identifiers::SessionId;
use crate::logger::Logger;
use crate::services::AgentServices;
use crate::storage::StorageServices;

/// Read-only view of the running agent that extensions may query.
pub trait AgentHandle: Send + Sync {
    fn agent_id(&self) -> &str;

    /// Top-level configuration section the resolver passed through untouched.
    fn config_section(&self, key: &str) -> Option<Value>;

    /// Names of every resolved tool, in declaration order.
    fn tool_names(&self) -> Vec<String>;
}

/// Non-owning reference to the agent.
///
/// The orchestrator owns the context builder, and the builder hands this
/// reference to extensions; holding it weakly keeps that loop from owning
/// itself.
#[derive(Clone)]
pub struct AgentRef {
    id: Arc<str>,
    handle: Weak<dyn AgentHandle>,
}

struct DetachedAgent;

impl AgentHandle for DetachedAgent {
    fn agent_id(&self) -> &str {
        ""
    }

    fn config_section(&self, _key: &str) -> Option<Value> {
        None
    }

    fn tool_names(&self) -> Vec<String> {
        Vec::new()
    }
}

impl AgentRef {
    pub fn new(id: impl Into<Arc<str>>, handle: Weak<dyn AgentHandle>) -> Self {
        Self {
            id: id.into(),
            handle,
        }
    }

    /// A reference that never upgrades, for hosts without a live agent.
    pub fn detached(id: impl Into<Arc<str>>) -> Self {
        let handle: Weak<dyn AgentHandle> = Weak::<DetachedAgent>::new();
        Self::new(id, handle)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn upgrade(&self) -> Option<Arc<dyn AgentHandle>> {
        self.handle.upgrade()
    }

    /// Upgrade or fail with [`ExtensionError::AgentUnavailable`].
    pub fn require(&self) -> ExtensionResult<Arc<dyn AgentHandle>> {
        self.upgrade().ok_or(ExtensionError::AgentUnavailable)
    }
}

impl fmt::Debug for AgentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRef")
            .field("id", &self.id)
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}

/// Everything a tool may use while it runs.
#[derive(Clone)]
pub struct ToolExecutionContext {
    pub logger: Arc<dyn Logger>,
    pub storage: StorageServices,
    pub services: AgentServices,
    pub agent: AgentRef,
}

impl fmt::Debug for ToolExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolExecutionContext")
            .field("storage", &self.storage)
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}

/// Everything a plugin may use while it runs.
#[derive(Clone)]
pub struct PluginExecutionContext {
    pub logger: Arc<dyn Logger>,
    pub storage: StorageServices,
    pub agent: AgentRef,
    pub session_id: SessionId,
    pub user_id: Option<String>,
}

impl fmt::Debug for PluginExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginExecutionContext")
            .field("storage", &self.storage)
            .field("agent", &self.agent)
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
