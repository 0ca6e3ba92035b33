//! Minimal extensions for exercising the resolver without real backends.

#![allow(dead_code)]

use async_trait::async_trait;
use capstan_core::{
    BlobInfo, BlobStore, Cache, CompactionContext, CompactionResult, CompactionStrategy, Database,
    ExtensionResult, HookPoint, LogLevel, Logger, Message, Plugin, PluginExecutionContext,
    PluginOutcome, StorageResult, Tool, ToolExecutionContext,
};
use capstan_resolver::{
    BundleMetadata, CapabilityBundle, ConfigDocument, ConfigSchema, FactoryError, FactoryResult,
    TypedFactory, blob_factory, cache_factory, compaction_factory, database_factory,
    logger_factory, plugin_factory, tool_factory,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct NullLogger(pub LogLevel);

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}

    fn level(&self) -> LogLevel {
        self.0
    }

    fn child(&self, _component: &str) -> Arc<dyn Logger> {
        Arc::new(NullLogger(self.0))
    }
}

pub struct NullStore(pub &'static str);

#[async_trait]
impl BlobStore for NullStore {
    fn backend(&self) -> &str {
        self.0
    }

    async fn put(&self, key: &str, data: Vec<u8>, _ct: Option<&str>) -> StorageResult<BlobInfo> {
        Ok(BlobInfo {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: None,
        })
    }

    async fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn list(&self, _prefix: &str) -> StorageResult<Vec<BlobInfo>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl Database for NullStore {
    fn backend(&self) -> &str {
        self.0
    }

    async fn get(&self, _key: &str) -> StorageResult<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value) -> StorageResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn list_keys(&self, _prefix: &str) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn append(&self, _key: &str, _value: Value) -> StorageResult<usize> {
        Ok(1)
    }
}

#[async_trait]
impl Cache for NullStore {
    fn backend(&self) -> &str {
        self.0
    }

    async fn get(&self, _key: &str) -> StorageResult<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> StorageResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn increment(&self, _key: &str, delta: i64, _ttl: Option<Duration>) -> StorageResult<i64> {
        Ok(delta)
    }
}

pub struct EchoTool(pub String);

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.0
    }

    fn description(&self) -> &str {
        "echoes its input"
    }

    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        Ok(input)
    }
}

pub struct TagPlugin(pub String);

#[async_trait]
impl Plugin for TagPlugin {
    fn name(&self) -> &str {
        &self.0
    }

    async fn on_hook(
        &self,
        _point: HookPoint,
        _payload: &mut Value,
        _ctx: &PluginExecutionContext,
    ) -> ExtensionResult<PluginOutcome> {
        Ok(PluginOutcome::Continue)
    }
}

pub struct Noop;

impl CompactionStrategy for Noop {
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

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FilesystemConfig {
    pub allowed_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Empty {}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Option<LogLevel>,
}

fn tools(names: &'static [&'static str]) -> Vec<Arc<dyn Tool>> {
    names
        .iter()
        .map(|name| Arc::new(EchoTool(name.to_string())) as Arc<dyn Tool>)
        .collect()
}

/// Bundle with two tool groups, two plugins and one of everything else.
pub fn fixture_bundle() -> CapabilityBundle {
    CapabilityBundle::builder(
        BundleMetadata::new("fixture", "1.0.0", "resolver test fixture"),
        logger_factory(|config: LoggerConfig| -> FactoryResult<Arc<dyn Logger>> {
            Ok(Arc::new(NullLogger(config.level.unwrap_or_default())))
        }),
    )
    .tool(
        "filesystem-tools",
        tool_factory(|_: FilesystemConfig| {
            Ok(tools(&["read_file", "write_file", "list_directory"]))
        }),
    )
    .tool("process-tools", tool_factory(|_: Empty| Ok(tools(&["run_process"]))))
    .blob(
        "local",
        blob_factory(|_: Value, _logger: Arc<dyn Logger>| async {
            Ok(Arc::new(NullStore("local")) as Arc<dyn BlobStore>)
        }),
    )
    .database(
        "memory",
        database_factory(|_: Empty, _logger: Arc<dyn Logger>| async {
            Ok(Arc::new(NullStore("memory")) as Arc<dyn Database>)
        }),
    )
    .cache(
        "memory",
        cache_factory(|_: Empty, _logger: Arc<dyn Logger>| async {
            Ok(Arc::new(NullStore("memory")) as Arc<dyn Cache>)
        }),
    )
    .plugin(
        "audit",
        plugin_factory(|_: Empty| Ok(Arc::new(TagPlugin("audit".into())) as Arc<dyn Plugin>)),
    )
    .plugin(
        "rate-limit",
        plugin_factory(|_: Value| Ok(Arc::new(TagPlugin("rate-limit".into())) as Arc<dyn Plugin>)),
    )
    .plugin(
        "broken",
        Arc::new(
            TypedFactory::<Value, _>::new(|_: Value| -> FactoryResult<Arc<dyn Plugin>> {
                Err(FactoryError::msg("backend unreachable"))
            })
            .with_schema(ConfigSchema::permissive()),
        ),
    )
    .compaction(
        "noop",
        compaction_factory(|_: Empty| Ok(Arc::new(Noop) as Arc<dyn CompactionStrategy>)),
    )
    .defaults(
        ConfigDocument::from_value(json!({
            "storage": {
                "blob": { "type": "local" },
                "database": { "type": "memory" },
                "cache": { "type": "memory" }
            },
            "compaction": { "type": "noop" }
        }))
        .unwrap_or_default(),
    )
    .build()
}

/// Factory invocations in call order, plus the logger each storage factory
/// was handed.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
    storage_loggers: Arc<Mutex<Vec<Arc<dyn Logger>>>>,
}

impl CallLog {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn record_storage(&self, slot: &str, logger: Arc<dyn Logger>) {
        self.record(format!("{slot}:{}", logger.level()));
        self.storage_loggers.lock().unwrap().push(logger);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn storage_loggers(&self) -> Vec<Arc<dyn Logger>> {
        self.storage_loggers.lock().unwrap().clone()
    }
}

/// One type per category, each writing to `log` when its factory runs.
/// Blob storage also offers `failing`, whose factory always errors.
pub fn call_log_bundle(log: &CallLog) -> CapabilityBundle {
    let logger = {
        let log = log.clone();
        logger_factory(move |config: LoggerConfig| -> FactoryResult<Arc<dyn Logger>> {
            log.record("logger".into());
            Ok(Arc::new(NullLogger(config.level.unwrap_or_default())))
        })
    };
    let local = {
        let log = log.clone();
        blob_factory(move |_: Value, logger: Arc<dyn Logger>| {
            log.record_storage("blob", logger);
            async { Ok(Arc::new(NullStore("local")) as Arc<dyn BlobStore>) }
        })
    };
    let failing = {
        let log = log.clone();
        blob_factory(move |_: Value, logger: Arc<dyn Logger>| {
            log.record_storage("blob", logger);
            async { Err::<Arc<dyn BlobStore>, _>(FactoryError::msg("disk unavailable")) }
        })
    };
    let database = {
        let log = log.clone();
        database_factory(move |_: Empty, logger: Arc<dyn Logger>| {
            log.record_storage("database", logger);
            async { Ok(Arc::new(NullStore("memory")) as Arc<dyn Database>) }
        })
    };
    let cache = {
        let log = log.clone();
        cache_factory(move |_: Empty, logger: Arc<dyn Logger>| {
            log.record_storage("cache", logger);
            async { Ok(Arc::new(NullStore("memory")) as Arc<dyn Cache>) }
        })
    };
    let process = {
        let log = log.clone();
        tool_factory(move |_: Empty| {
            log.record("tools:process-tools".into());
            Ok(tools(&["run_process"]))
        })
    };
    let audit = {
        let log = log.clone();
        plugin_factory(move |_: Empty| {
            log.record("plugins:audit".into());
            Ok(Arc::new(TagPlugin("audit".into())) as Arc<dyn Plugin>)
        })
    };
    let noop = {
        let log = log.clone();
        compaction_factory(move |_: Empty| {
            log.record("compaction:noop".into());
            Ok(Arc::new(Noop) as Arc<dyn CompactionStrategy>)
        })
    };

    CapabilityBundle::builder(BundleMetadata::new("call-log", "1.0.0", "records factory calls"), logger)
        .blob("local", local)
        .blob("failing", failing)
        .database("memory", database)
        .cache("memory", cache)
        .tool("process-tools", process)
        .plugin("audit", audit)
        .compaction("noop", noop)
        .defaults(
            ConfigDocument::from_value(json!({
                "storage": {
                    "blob": { "type": "local" },
                    "database": { "type": "memory" },
                    "cache": { "type": "memory" }
                },
                "compaction": { "type": "noop" }
            }))
            .unwrap_or_default(),
        )
        .build()
}
