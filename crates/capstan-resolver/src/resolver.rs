//! Service resolution.
//!
//! Walks the merged configuration in a fixed order (logger, blob, database,
//! cache, tools, plugins, compaction) and turns each entry into an instance
//! with lookup, validate, create. Storage factories receive the already
//! resolved logger; nothing else does. The first failure aborts the whole
//! resolution.

use capstan_core::{CompactionStrategy, Logger, Plugin, StorageServices, Tool};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::bundle::CapabilityBundle;
use crate::config::{AgentConfig, ExtensionEntry};
use crate::error::{ExtensionCategory, FactoryError, ResolveError};
use crate::factory::Factory;
use crate::schema::TYPE_KEY;

/// Every extension instance an agent needs, fully constructed.
#[derive(Clone)]
pub struct ResolvedServices {
    pub logger: Arc<dyn Logger>,
    pub storage: StorageServices,
    /// Declaration order, fan-out groups contiguous.
    pub tools: Vec<Arc<dyn Tool>>,
    /// Declaration order; this is the plugin execution order.
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub compaction: Arc<dyn CompactionStrategy>,
}

impl ResolvedServices {
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// First tool registered under `name`.
    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn summary(&self) -> ResolvedSummary {
        ResolvedSummary {
            logger_level: self.logger.level().to_string(),
            blob: self.storage.blob.backend().to_string(),
            database: self.storage.database.backend().to_string(),
            cache: self.storage.cache.backend().to_string(),
            tools: self.tool_names(),
            plugins: self.plugin_names(),
            compaction: self.compaction.name().to_string(),
        }
    }
}

impl fmt::Debug for ResolvedServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedServices")
            .field("logger", &self.logger)
            .field("storage", &self.storage)
            .field("tools", &self.tool_names())
            .field("plugins", &self.plugin_names())
            .field("compaction", &self.compaction.name())
            .finish()
    }
}

/// Serializable description of what was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSummary {
    pub logger_level: String,
    pub blob: String,
    pub database: String,
    pub cache: String,
    pub tools: Vec<String>,
    pub plugins: Vec<String>,
    pub compaction: String,
}

pub struct ServiceResolver<'a> {
    bundle: &'a CapabilityBundle,
}

impl<'a> ServiceResolver<'a> {
    pub fn new(bundle: &'a CapabilityBundle) -> Self {
        Self { bundle }
    }

    pub async fn resolve(&self, config: &AgentConfig) -> Result<ResolvedServices, ResolveError> {
        let bundle = &self.bundle.metadata.name;
        let resolved = self.resolve_inner(config).await.inspect_err(|err| {
            tracing::warn!(
                bundle = %bundle,
                category = %err.category(),
                error = %err,
                "Service resolution failed"
            );
        })?;

        tracing::info!(
            bundle = %bundle,
            tools = resolved.tools.len(),
            plugins = resolved.plugins.len(),
            compaction = resolved.compaction.name(),
            "Resolved agent services"
        );
        Ok(resolved)
    }

    async fn resolve_inner(&self, config: &AgentConfig) -> Result<ResolvedServices, ResolveError> {
        let logger = self.resolve_logger(config)?;
        let storage = self.resolve_storage(config, &logger).await?;
        let tools = self.resolve_tools(&config.tools)?;
        let plugins = self.resolve_plugins(&config.plugins)?;
        let compaction = self.resolve_compaction(&config.compaction)?;

        Ok(ResolvedServices {
            logger,
            storage,
            tools,
            plugins,
            compaction,
        })
    }

    fn resolve_logger(&self, config: &AgentConfig) -> Result<Arc<dyn Logger>, ResolveError> {
        let category = ExtensionCategory::Logger;
        let type_name = config
            .logger
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or("logger")
            .to_string();
        let factory = &self.bundle.logger;

        let options = factory
            .config_schema()
            .validate(&Value::Object(config.logger.clone()))
            .map_err(|source| ResolveError::SchemaValidation {
                category,
                type_name: type_name.clone(),
                source,
            })?;
        let logger = factory
            .create(options)
            .map_err(|source| creation_failed(category, &type_name, source))?;

        tracing::debug!(category = %category, level = %logger.level(), "Resolved logger");
        Ok(logger)
    }

    async fn resolve_storage(
        &self,
        config: &AgentConfig,
        logger: &Arc<dyn Logger>,
    ) -> Result<StorageServices, ResolveError> {
        let storage = &self.bundle.storage;

        let category = ExtensionCategory::BlobStorage;
        let entry = &config.storage.blob;
        let (factory, options) = self.prepare(&storage.blob, entry, category)?;
        let blob = factory
            .create(options, logger.clone())
            .await
            .map_err(|source| creation_failed(category, &entry.kind, source))?;

        let category = ExtensionCategory::DatabaseStorage;
        let entry = &config.storage.database;
        let (factory, options) = self.prepare(&storage.database, entry, category)?;
        let database = factory
            .create(options, logger.clone())
            .await
            .map_err(|source| creation_failed(category, &entry.kind, source))?;

        let category = ExtensionCategory::CacheStorage;
        let entry = &config.storage.cache;
        let (factory, options) = self.prepare(&storage.cache, entry, category)?;
        let cache = factory
            .create(options, logger.clone())
            .await
            .map_err(|source| creation_failed(category, &entry.kind, source))?;

        tracing::debug!(
            blob = blob.backend(),
            database = database.backend(),
            cache = cache.backend(),
            "Resolved storage"
        );
        Ok(StorageServices {
            blob,
            database,
            cache,
        })
    }

    fn resolve_tools(&self, entries: &[ExtensionEntry]) -> Result<Vec<Arc<dyn Tool>>, ResolveError> {
        let category = ExtensionCategory::Tool;
        let mut tools = Vec::new();
        for entry in entries {
            if skip_disabled(entry, category) {
                continue;
            }
            let (factory, options) = self.prepare(&self.bundle.tools, entry, category)?;
            let group = factory
                .create(options)
                .map_err(|source| creation_failed(category, &entry.kind, source))?;
            tracing::debug!(
                category = %category,
                kind = %entry.kind,
                count = group.len(),
                "Resolved tool entry"
            );
            tools.extend(group);
        }

        let mut seen = HashSet::new();
        for tool in &tools {
            if !seen.insert(tool.name()) {
                tracing::warn!(tool = tool.name(), "Duplicate tool name after resolution");
            }
        }
        Ok(tools)
    }

    fn resolve_plugins(
        &self,
        entries: &[ExtensionEntry],
    ) -> Result<Vec<Arc<dyn Plugin>>, ResolveError> {
        let category = ExtensionCategory::Plugin;
        let mut plugins = Vec::with_capacity(entries.len());
        for entry in entries {
            if skip_disabled(entry, category) {
                continue;
            }
            let (factory, options) = self.prepare(&self.bundle.plugins, entry, category)?;
            let plugin = factory
                .create(options)
                .map_err(|source| creation_failed(category, &entry.kind, source))?;
            tracing::debug!(category = %category, kind = %entry.kind, "Resolved plugin");
            plugins.push(plugin);
        }
        Ok(plugins)
    }

    fn resolve_compaction(
        &self,
        entry: &ExtensionEntry,
    ) -> Result<Arc<dyn CompactionStrategy>, ResolveError> {
        let category = ExtensionCategory::Compaction;
        let (factory, options) = self.prepare(&self.bundle.compaction, entry, category)?;
        let strategy = factory
            .create(options)
            .map_err(|source| creation_failed(category, &entry.kind, source))?;
        tracing::debug!(category = %category, kind = %entry.kind, "Resolved compaction");
        Ok(strategy)
    }

    /// Look the entry's type up, strip `enabled` and validate what is left
    /// against the factory's schema.
    fn prepare<'f, F>(
        &self,
        factories: &'f BTreeMap<String, Arc<F>>,
        entry: &ExtensionEntry,
        category: ExtensionCategory,
    ) -> Result<(&'f F, Value), ResolveError>
    where
        F: Factory + ?Sized,
    {
        let factory = factories
            .get(&entry.kind)
            .ok_or_else(|| ResolveError::UnknownType {
                category,
                attempted_type: entry.kind.clone(),
                available_types: factories.keys().cloned().collect(),
                bundle: self.bundle.metadata.name.clone(),
            })?;

        let options = factory
            .config_schema()
            .validate(&entry.schema_input())
            .map_err(|source| ResolveError::SchemaValidation {
                category,
                type_name: entry.kind.clone(),
                source,
            })?;
        Ok((&**factory, options))
    }
}

fn creation_failed(category: ExtensionCategory, type_name: &str, source: FactoryError) -> ResolveError {
    ResolveError::CreationFailed {
        category,
        type_name: type_name.to_string(),
        source,
    }
}

/// Disabled entries are dropped before lookup, so their fields are never
/// validated. Only tools and plugins can be disabled.
fn skip_disabled(entry: &ExtensionEntry, category: ExtensionCategory) -> bool {
    let skip = category.allows_disable() && !entry.is_enabled();
    if skip {
        tracing::debug!(category = %category, kind = %entry.kind, "Skipping disabled entry");
    }
    skip
}

/// Resolve every extension point of `config` against `bundle`.
pub async fn resolve_services(
    config: &AgentConfig,
    bundle: &CapabilityBundle,
) -> Result<ResolvedServices, ResolveError> {
    ServiceResolver::new(bundle).resolve(config).await
}
