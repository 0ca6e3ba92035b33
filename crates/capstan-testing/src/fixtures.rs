//! A small, fully in-memory bundle for end-to-end tests.
//!
//! | Category | Types |
//! |---|---|
//! | tools | `filesystem-tools` (3 tools, `allowedPaths` required), `process-tools` |
//! | storage | `in-memory` for blob, database and cache |
//! | plugins | `audit`, `rate-limit` |
//! | compaction | `noop` |

use capstan_core::{
    CompactionContext, CompactionResult, CompactionStrategy, LogLevel, Logger, Message, Plugin,
    Tool,
};
use capstan_resolver::{
    BundleLoader, BundleMetadata, CapabilityBundle, ConfigDocument, FactoryResult,
    StaticBundleSource, compaction_factory, logger_factory, plugin_factory, tool_factory,
};
use capstan_storage::{in_memory_blob_factory, in_memory_cache_factory, in_memory_database_factory};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::doubles::{Journal, RecordingLogger, RecordingPlugin, RecordingTool};

pub const FIXTURE_BUNDLE: &str = "fixture";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FixtureFilesystemConfig {
    pub allowed_paths: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureNoOptions {}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureLoggerConfig {
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Keeps the history untouched.
#[derive(Debug, Default)]
pub struct KeepAll;

impl CompactionStrategy for KeepAll {
    fn name(&self) -> &str {
        "noop"
    }

    fn should_compact(&self, _ctx: &CompactionContext) -> bool {
        false
    }

    fn compact(&self, messages: &[Message]) -> CompactionResult {
        CompactionResult {
            messages: messages.to_vec(),
            discarded: Vec::new(),
        }
    }
}

/// Fixture bundle whose plugins write to a fresh journal.
pub fn fixture_bundle() -> CapabilityBundle {
    fixture_bundle_with(Journal::new())
}

/// Fixture bundle whose plugins write `<type>:<hook>` events to `journal`.
pub fn fixture_bundle_with(journal: Journal) -> CapabilityBundle {
    let logger = logger_factory(|config: FixtureLoggerConfig| -> FactoryResult<Arc<dyn Logger>> {
        Ok(Arc::new(RecordingLogger::new(config.level.unwrap_or_default())))
    });

    let filesystem = tool_factory(
        |_config: FixtureFilesystemConfig| -> FactoryResult<Vec<Arc<dyn Tool>>> {
            Ok(["read_file", "write_file", "list_directory"]
                .into_iter()
                .map(|name| Arc::new(RecordingTool::new(name)) as Arc<dyn Tool>)
                .collect())
        },
    );
    let process = tool_factory(|_: FixtureNoOptions| -> FactoryResult<Vec<Arc<dyn Tool>>> {
        Ok(vec![Arc::new(RecordingTool::new("run_process"))])
    });

    let plugin = |name: &'static str| {
        let journal = journal.clone();
        plugin_factory(move |_: FixtureNoOptions| -> FactoryResult<Arc<dyn Plugin>> {
            Ok(Arc::new(RecordingPlugin::new(name, journal.clone())))
        })
    };

    let noop = compaction_factory(|_: FixtureNoOptions| -> FactoryResult<Arc<dyn CompactionStrategy>> {
        Ok(Arc::new(KeepAll))
    });

    let defaults = ConfigDocument::from_value(json!({
        "storage": {
            "blob": { "type": "in-memory" },
            "database": { "type": "in-memory" },
            "cache": { "type": "in-memory" }
        },
        "compaction": { "type": "noop" }
    }))
    .unwrap_or_default();

    CapabilityBundle::builder(
        BundleMetadata::new(FIXTURE_BUNDLE, "0.0.1", "In-memory fixture bundle for tests")
            .with_target("test"),
        logger,
    )
    .defaults(defaults)
    .tool("filesystem-tools", filesystem)
    .tool("process-tools", process)
    .blob("in-memory", in_memory_blob_factory())
    .database("in-memory", in_memory_database_factory())
    .cache("in-memory", in_memory_cache_factory())
    .plugin("audit", plugin("audit"))
    .plugin("rate-limit", plugin("rate-limit"))
    .compaction("noop", noop)
    .build()
}

/// Source serving [`fixture_bundle`] under [`FIXTURE_BUNDLE`].
pub fn fixture_source() -> StaticBundleSource {
    StaticBundleSource::new().with_bundle(FIXTURE_BUNDLE, fixture_bundle)
}

pub fn fixture_loader() -> BundleLoader {
    BundleLoader::new(fixture_source())
}
