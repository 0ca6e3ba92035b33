//! # Capstan Resolver
//!
//! Turns a declarative agent configuration and a capability bundle into
//! concrete service instances.
//!
//! ```text
//! BundleLoader ──► CapabilityBundle ─────────────┐
//!                        │ defaults              ▼
//! ConfigDocument ──► apply_defaults ──► AgentConfig ──► ServiceResolver ──► ResolvedServices
//!                                                                               │
//!                                               ExecutionContextBuilder ◄───────┘
//! ```
//!
//! Factories only ever see their own configuration (plus the logger, for
//! storage). Orchestrator services reach tools and plugins through the
//! contexts built per invocation by [`ExecutionContextBuilder`].

pub mod bootstrap;
pub mod bundle;
pub mod config;
pub mod context_builder;
pub mod error;
pub mod factory;
pub mod loader;
pub mod resolver;
pub mod schema;

pub use bootstrap::{Bootstrapped, bootstrap};
pub use bundle::{
    BlobFactories, BundleMetadata, CacheFactories, CapabilityBundle, CapabilityBundleBuilder,
    CompactionFactories, DatabaseFactories, PluginFactories, StorageFactories, ToolFactories,
};
pub use config::{AgentConfig, ConfigDocument, ExtensionEntry, StorageConfig, apply_defaults};
pub use context_builder::ExecutionContextBuilder;
pub use error::{
    BundleError, CapstanError, CapstanResult, ConfigError, ExtensionCategory, FactoryError,
    ResolveError, SchemaError,
};
pub use factory::{
    BlobStoreFactory, CacheFactory, CompactionFactory, DatabaseFactory, Factory, FactoryResult,
    LoggerFactory, PluginFactory, ToolFactory, TypedFactory, blob_factory, cache_factory,
    compaction_factory, database_factory, logger_factory, plugin_factory, tool_factory,
};
pub use loader::{BundleConstructor, BundleLoader, BundleSource, FnBundleSource, LoadedModule, StaticBundleSource};
pub use resolver::{ResolvedServices, ResolvedSummary, ServiceResolver, resolve_services};
pub use schema::ConfigSchema;
