//! Orchestrator-owned services reachable from tool execution contexts.
//!
//! These traits are implemented by the orchestrator, not by bundles. They
//! exist before any tool runs and are shared by reference across all
//! concurrent invocations; each implementation handles its own locking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ExtensionResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub summary: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Denied { reason: String },
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approved)
    }
}

/// Asks the operator (or a policy) to confirm a sensitive action.
#[async_trait]
pub trait ApprovalService: Send + Sync {
    async fn request_approval(&self, request: ApprovalRequest) -> ExtensionResult<ApprovalDecision>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub session_id: String,
    pub snippet: String,
    pub score: f32,
}

/// Full-text search over stored conversation history.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> ExtensionResult<Vec<SearchHit>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    pub mime_type: Option<String>,
}

/// Resources the agent can read (files, MCP resources, blobs).
#[async_trait]
pub trait ResourceService: Send + Sync {
    async fn list(&self) -> ExtensionResult<Vec<ResourceInfo>>;

    async fn read(&self, uri: &str) -> ExtensionResult<Option<String>>;
}

/// Named prompt templates.
#[async_trait]
pub trait PromptService: Send + Sync {
    async fn list(&self) -> ExtensionResult<Vec<String>>;

    async fn render(&self, name: &str, arguments: Value) -> ExtensionResult<Option<String>>;
}

/// Connected MCP servers.
#[async_trait]
pub trait McpService: Send + Sync {
    async fn list_tools(&self) -> ExtensionResult<Vec<String>>;

    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> ExtensionResult<Value>;
}

/// Handles to every orchestrator-internal service.
#[derive(Clone)]
pub struct AgentServices {
    pub approval: Arc<dyn ApprovalService>,
    pub search: Arc<dyn SearchService>,
    pub resources: Arc<dyn ResourceService>,
    pub prompts: Arc<dyn PromptService>,
    pub mcp: Arc<dyn McpService>,
}

impl fmt::Debug for AgentServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentServices").finish_non_exhaustive()
    }
}
