//! # Capstan Builtins
//!
//! The `builtin` capability bundle: a `tracing` logger, reference storage
//! and tool groups, the `audit` and `rate-limit` plugins, and the `noop` and
//! `sliding-window` compaction strategies, with defaults that resolve an
//! agent from an empty configuration.
//!
//! ```rust
//! use capstan_builtins::{BUILTIN_BUNDLE, builtin_source};
//! use capstan_resolver::{BundleLoader, ConfigDocument, bootstrap};
//!
//! # tokio_test::block_on(async {
//! let loader = BundleLoader::new(builtin_source());
//! let ready = bootstrap(&loader, BUILTIN_BUNDLE, &ConfigDocument::new()).await.unwrap();
//! assert_eq!(ready.services.compaction.name(), "noop");
//! # });
//! ```

pub mod bundle;
pub mod compaction;
pub mod logger;
pub mod plugins;

pub use bundle::{BUILTIN_BUNDLE, BUILTIN_VERSION, builtin_bundle, builtin_defaults, builtin_source};
pub use compaction::{
    NoopCompaction, SlidingWindowCompaction, SlidingWindowConfig, noop_compaction_factory,
    sliding_window_compaction_factory,
};
pub use logger::{TracingLogger, TracingLoggerConfig, tracing_logger_factory};
pub use plugins::{
    AuditConfig, AuditPlugin, AuditRecord, RateLimitConfig, RateLimitPlugin,
    audit_plugin_factory, rate_limit_plugin_factory,
};
