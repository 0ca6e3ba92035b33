//! # Capstan Core
//!
//! Contracts that extension authors write against: tools, lifecycle plugins,
//! compaction strategies, loggers and storage backends, plus the execution
//! contexts through which orchestrator services reach them at call time.
//!
//! Nothing in this crate knows how extensions are configured or resolved;
//! that lives in `capstan-resolver`.

pub mod compaction;
pub mod context;
pub mod error;
pub mod identifiers;
pub mod logger;
pub mod plugin;
pub mod services;
pub mod storage;
pub mod tool;
pub mod validation;

pub use compaction::{CompactionContext, CompactionResult, CompactionStrategy, Message, Role};
pub use context::{AgentHandle, AgentRef, PluginExecutionContext, ToolExecutionContext};
pub use error::{BoxError, ExtensionError, ExtensionResult, StorageError, StorageResult};
pub use identifiers::SessionId;
pub use logger::{LogLevel, Logger};
pub use plugin::{HookPoint, Plugin, PluginOutcome, run_plugin_chain};
pub use services::{
    AgentServices, ApprovalDecision, ApprovalRequest, ApprovalService, McpService,
    PromptService, ResourceInfo, ResourceService, SearchHit, SearchService,
};
pub use storage::{BlobInfo, BlobStore, Cache, Database, StorageServices};
pub use tool::Tool;
pub use validation::{IdentifierRules, ValidationError};
