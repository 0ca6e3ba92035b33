//! Recording doubles for loggers, tools, plugins and orchestrator services.

use async_trait::async_trait;
use capstan_core::{
    AgentRef, AgentServices, ApprovalDecision, ApprovalRequest, ApprovalService, ExtensionError,
    ExtensionResult, HookPoint, LogLevel, Logger, McpService, Plugin, PluginExecutionContext,
    PluginOutcome, PromptService, ResourceInfo, ResourceService, SearchHit, SearchService,
    SessionId, StorageServices, Tool, ToolExecutionContext,
};
use capstan_storage::{InMemoryBlobStore, InMemoryCache, InMemoryDatabase};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared, ordered record of events across several doubles.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        lock(&self.events).push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

/// Logger keeping every record in memory.
#[derive(Debug, Clone)]
pub struct RecordingLogger {
    level: LogLevel,
    component: Option<String>,
    records: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl RecordingLogger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            component: None,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn records(&self) -> Vec<(LogLevel, String)> {
        lock(&self.records).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, message)| message).collect()
    }
}

impl Default for RecordingLogger {
    fn default() -> Self {
        Self::new(LogLevel::Trace)
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let message = match &self.component {
            Some(component) => format!("[{component}] {message}"),
            None => message.to_string(),
        };
        lock(&self.records).push((level, message));
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn child(&self, component: &str) -> Arc<dyn Logger> {
        let component = match &self.component {
            Some(parent) => format!("{parent}.{component}"),
            None => component.to_string(),
        };
        Arc::new(Self {
            level: self.level,
            component: Some(component),
            records: self.records.clone(),
        })
    }
}

/// Tool that records its inputs and echoes them back.
#[derive(Debug, Clone)]
pub struct RecordingTool {
    name: String,
    inputs: Arc<Mutex<Vec<Value>>>,
    failure: Option<String>,
}

impl RecordingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// Make every call fail with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn inputs(&self) -> Vec<Value> {
        lock(&self.inputs).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.inputs).len()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "records its input and echoes it back"
    }

    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        lock(&self.inputs).push(input.clone());
        match &self.failure {
            Some(reason) => Err(ExtensionError::failed(&self.name, reason.clone())),
            None => Ok(input),
        }
    }
}

/// Plugin that writes `<name>:<hook>` to a journal and can cancel on one
/// hook point.
#[derive(Debug, Clone)]
pub struct RecordingPlugin {
    name: String,
    journal: Journal,
    cancel_on: Option<HookPoint>,
}

impl RecordingPlugin {
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
            cancel_on: None,
        }
    }

    pub fn cancel_on(mut self, point: HookPoint) -> Self {
        self.cancel_on = Some(point);
        self
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_hook(
        &self,
        point: HookPoint,
        _payload: &mut Value,
        _ctx: &PluginExecutionContext,
    ) -> ExtensionResult<PluginOutcome> {
        self.journal.record(format!("{}:{}", self.name, point));
        if self.cancel_on == Some(point) {
            return Ok(PluginOutcome::Cancel {
                plugin: self.name.clone(),
                reason: format!("cancelled at {point}"),
            });
        }
        Ok(PluginOutcome::Continue)
    }
}

/// Orchestrator services with fixed answers. Approval requests are recorded.
#[derive(Debug, Clone)]
pub struct StubServices {
    decision: ApprovalDecision,
    approvals: Arc<Mutex<Vec<ApprovalRequest>>>,
}

impl Default for StubServices {
    fn default() -> Self {
        Self {
            decision: ApprovalDecision::Approved,
            approvals: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl StubServices {
    pub fn denying(reason: impl Into<String>) -> Self {
        Self {
            decision: ApprovalDecision::Denied {
                reason: reason.into(),
            },
            ..Self::default()
        }
    }

    pub fn approval_requests(&self) -> Vec<ApprovalRequest> {
        lock(&self.approvals).clone()
    }

    pub fn agent_services(&self) -> AgentServices {
        let shared = Arc::new(self.clone());
        AgentServices {
            approval: shared.clone(),
            search: shared.clone(),
            resources: shared.clone(),
            prompts: shared.clone(),
            mcp: shared,
        }
    }
}

#[async_trait]
impl ApprovalService for StubServices {
    async fn request_approval(&self, request: ApprovalRequest) -> ExtensionResult<ApprovalDecision> {
        lock(&self.approvals).push(request);
        Ok(self.decision.clone())
    }
}

#[async_trait]
impl SearchService for StubServices {
    async fn search(&self, _query: &str, _limit: usize) -> ExtensionResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ResourceService for StubServices {
    async fn list(&self) -> ExtensionResult<Vec<ResourceInfo>> {
        Ok(Vec::new())
    }

    async fn read(&self, _uri: &str) -> ExtensionResult<Option<String>> {
        Ok(None)
    }
}

#[async_trait]
impl PromptService for StubServices {
    async fn list(&self) -> ExtensionResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn render(&self, _name: &str, _arguments: Value) -> ExtensionResult<Option<String>> {
        Ok(None)
    }
}

#[async_trait]
impl McpService for StubServices {
    async fn list_tools(&self) -> ExtensionResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, server: &str, tool: &str, _arguments: Value) -> ExtensionResult<Value> {
        Err(ExtensionError::failed(
            format!("mcp:{server}"),
            format!("no MCP server available to run '{tool}'"),
        ))
    }
}

/// Fresh in-memory storage for all three slots.
pub fn memory_storage() -> StorageServices {
    StorageServices {
        blob: Arc::new(InMemoryBlobStore::new()),
        database: Arc::new(InMemoryDatabase::new()),
        cache: Arc::new(InMemoryCache::default()),
    }
}

/// Tool context over in-memory storage, stub services and a detached agent.
pub fn tool_context() -> ToolExecutionContext {
    ToolExecutionContext {
        logger: Arc::new(RecordingLogger::default()),
        storage: memory_storage(),
        services: StubServices::default().agent_services(),
        agent: AgentRef::detached("test-agent"),
    }
}

/// Plugin context sharing `storage`, for `session_id`.
pub fn plugin_context(storage: StorageServices, session_id: SessionId) -> PluginExecutionContext {
    PluginExecutionContext {
        logger: Arc::new(RecordingLogger::default()),
        storage,
        agent: AgentRef::detached("test-agent"),
        session_id,
        user_id: None,
    }
}
