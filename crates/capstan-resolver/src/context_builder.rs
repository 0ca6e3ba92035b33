//! Execution context builder.
//!
//! Owned by the orchestrator and constructed once, after every service
//! exists. Tool and plugin invocation paths call it immediately before each
//! call; the returned context shares the underlying service handles but is a
//! fresh value every time.

use capstan_core::{
    AgentRef, AgentServices, Logger, PluginExecutionContext, SessionId, StorageServices,
    ToolExecutionContext,
};
use std::fmt;
use std::sync::Arc;

use crate::resolver::ResolvedServices;

#[derive(Clone)]
pub struct ExecutionContextBuilder {
    logger: Arc<dyn Logger>,
    storage: StorageServices,
    services: AgentServices,
    agent: AgentRef,
}

impl ExecutionContextBuilder {
    pub fn new(resolved: &ResolvedServices, services: AgentServices, agent: AgentRef) -> Self {
        Self {
            logger: resolved.logger.clone(),
            storage: resolved.storage.clone(),
            services,
            agent,
        }
    }

    pub fn build_tool_context(&self) -> ToolExecutionContext {
        ToolExecutionContext {
            logger: self.logger.clone(),
            storage: self.storage.clone(),
            services: self.services.clone(),
            agent: self.agent.clone(),
        }
    }

    pub fn build_plugin_context(
        &self,
        session_id: SessionId,
        user_id: Option<String>,
    ) -> PluginExecutionContext {
        PluginExecutionContext {
            logger: self.logger.clone(),
            storage: self.storage.clone(),
            agent: self.agent.clone(),
            session_id,
            user_id,
        }
    }

    pub fn agent(&self) -> &AgentRef {
        &self.agent
    }
}

impl fmt::Debug for ExecutionContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContextBuilder")
            .field("storage", &self.storage)
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}
