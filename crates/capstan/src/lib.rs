//! # Capstan
//!
//! Capability resolution for extensible agent runtimes. A declarative agent
//! configuration plus a loaded capability bundle become concrete service
//! instances; orchestrator services reach those instances only through
//! execution contexts built at call time.
//!
//! ## Core Components
//!
//! - **[CapabilityBundle]**: factories per extension point, plus defaults
//! - **[BundleLoader]**: identifier to shape-checked bundle
//! - **[apply_defaults]**: bundle defaults merged under a configuration
//! - **[ServiceResolver]**: merged configuration to [ResolvedServices]
//! - **[ExecutionContextBuilder]**: per-invocation tool and plugin contexts
//! - **[AgentRuntime]**: a minimal orchestrator wiring the above together
//!
//! ## Quick Start
//!
//! ```rust
//! use capstan::{AgentRuntime, BUILTIN_BUNDLE, BundleLoader, ConfigDocument, SessionId};
//! use capstan_testing::StubServices;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let loader = BundleLoader::new(capstan::builtin_source());
//! let document = ConfigDocument::from_yaml_str("plugins:\n  - type: audit\n").unwrap();
//! let runtime = AgentRuntime::start(
//!     "agent-1",
//!     &loader,
//!     BUILTIN_BUNDLE,
//!     &document,
//!     StubServices::default().agent_services(),
//! )
//! .await
//! .unwrap();
//!
//! let session = SessionId::parse("session-1").unwrap();
//! let output = runtime
//!     .call_tool(&session, None, "text_uppercase", json!({ "text": "hi" }))
//!     .await
//!     .unwrap();
//! assert_eq!(output["result"], "HI");
//! # });
//! ```

pub mod runtime;

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use capstan_builtins as builtins;
pub use capstan_core as core;
pub use capstan_resolver as resolver;
pub use capstan_storage as storage;
pub use capstan_tools as tools;

#[cfg(feature = "testing")]
pub use capstan_testing as testing;

// ============================================================================
// Extension contracts
// ============================================================================

pub use capstan_core::{
    AgentHandle, AgentRef, AgentServices, CompactionContext, CompactionResult,
    CompactionStrategy, ExtensionError, ExtensionResult, HookPoint, LogLevel, Logger, Message,
    Plugin, PluginExecutionContext, PluginOutcome, Role, SessionId, StorageError,
    StorageServices, Tool, ToolExecutionContext, run_plugin_chain,
};

// ============================================================================
// Resolution
// ============================================================================

pub use capstan_resolver::{
    AgentConfig, Bootstrapped, BundleError, BundleLoader, BundleMetadata, BundleSource,
    CapabilityBundle, CapstanError, CapstanResult, ConfigDocument, ConfigError, ConfigSchema,
    ExecutionContextBuilder, ExtensionCategory, ExtensionEntry, FactoryError, ResolveError,
    ResolvedServices, ResolvedSummary, ServiceResolver, StaticBundleSource, apply_defaults, bootstrap,
    resolve_services,
};

// ============================================================================
// Builtin bundle
// ============================================================================

pub use capstan_builtins::{BUILTIN_BUNDLE, builtin_bundle, builtin_source};

// ============================================================================
// Runtime
// ============================================================================

pub use runtime::{AgentRuntime, RuntimeError, RuntimeResult};
