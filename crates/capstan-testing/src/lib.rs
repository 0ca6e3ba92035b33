//! # Capstan Testing
//!
//! Test doubles and a fixture bundle for exercising resolution and
//! extensions without real backends.
//!
//! ## Components
//!
//! - **Doubles**: [`RecordingLogger`], [`RecordingTool`], [`RecordingPlugin`]
//!   and [`StubServices`] for the orchestrator-owned services
//! - **Contexts**: [`tool_context`] and [`plugin_context`] over in-memory storage
//! - **Fixtures**: [`fixture_bundle`] and a loader serving it
//!
//! ## Usage
//!
//! ```rust
//! use capstan_resolver::{ConfigDocument, bootstrap};
//! use capstan_testing::{FIXTURE_BUNDLE, fixture_loader};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let document = ConfigDocument::from_value(json!({
//!     "tools": [{ "type": "process-tools" }]
//! }))
//! .unwrap();
//! let ready = bootstrap(&fixture_loader(), FIXTURE_BUNDLE, &document).await.unwrap();
//! assert_eq!(ready.services.tool_names(), vec!["run_process"]);
//! # });
//! ```

pub mod doubles;
pub mod fixtures;

pub use doubles::{
    Journal, RecordingLogger, RecordingPlugin, RecordingTool, StubServices, memory_storage,
    plugin_context, tool_context,
};
pub use fixtures::{
    FIXTURE_BUNDLE, FixtureFilesystemConfig, KeepAll, fixture_bundle, fixture_bundle_with,
    fixture_loader, fixture_source,
};
