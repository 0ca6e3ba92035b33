//! Capability bundles.
//!
//! A bundle is a plain value: metadata, optional configuration defaults and
//! one factory map per extension point. Map keys are the literal type
//! strings configuration refers to. Bundles are never mutated to register
//! new entries; combining two bundles is ordinary map merging
//! ([`CapabilityBundle::compose`]).

use capstan_core::IdentifierRules;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigDocument, apply_defaults};
use crate::error::{BundleError, ExtensionCategory};
use crate::factory::{
    BlobStoreFactory, CacheFactory, CompactionFactory, DatabaseFactory, LoggerFactory,
    PluginFactory, ToolFactory,
};
use crate::schema::json_kind;

pub type ToolFactories = BTreeMap<String, Arc<dyn ToolFactory>>;
pub type PluginFactories = BTreeMap<String, Arc<dyn PluginFactory>>;
pub type CompactionFactories = BTreeMap<String, Arc<dyn CompactionFactory>>;
pub type BlobFactories = BTreeMap<String, Arc<dyn BlobStoreFactory>>;
pub type DatabaseFactories = BTreeMap<String, Arc<dyn DatabaseFactory>>;
pub type CacheFactories = BTreeMap<String, Arc<dyn CacheFactory>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Host or runtime the bundle is built for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl BundleMetadata {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            target: None,
            constraints: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}

/// The three storage namespaces. A blob factory can only live in `blob`.
#[derive(Clone, Default)]
pub struct StorageFactories {
    pub blob: BlobFactories,
    pub database: DatabaseFactories,
    pub cache: CacheFactories,
}

#[derive(Clone)]
pub struct CapabilityBundle {
    pub metadata: BundleMetadata,
    pub defaults: Option<ConfigDocument>,
    pub tools: ToolFactories,
    pub storage: StorageFactories,
    pub plugins: PluginFactories,
    pub compaction: CompactionFactories,
    pub logger: Arc<dyn LoggerFactory>,
}

impl CapabilityBundle {
    pub fn builder(
        metadata: BundleMetadata,
        logger: Arc<dyn LoggerFactory>,
    ) -> CapabilityBundleBuilder {
        CapabilityBundleBuilder {
            bundle: CapabilityBundle {
                metadata,
                defaults: None,
                tools: BTreeMap::new(),
                storage: StorageFactories::default(),
                plugins: BTreeMap::new(),
                compaction: BTreeMap::new(),
                logger,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Sorted type strings registered for `category`. The logger has a
    /// single unnamed factory, so its list is empty.
    pub fn type_names(&self, category: ExtensionCategory) -> Vec<String> {
        fn keys<V>(map: &BTreeMap<String, V>) -> Vec<String> {
            map.keys().cloned().collect()
        }
        match category {
            ExtensionCategory::Logger => Vec::new(),
            ExtensionCategory::BlobStorage => keys(&self.storage.blob),
            ExtensionCategory::DatabaseStorage => keys(&self.storage.database),
            ExtensionCategory::CacheStorage => keys(&self.storage.cache),
            ExtensionCategory::Tool => keys(&self.tools),
            ExtensionCategory::Plugin => keys(&self.plugins),
            ExtensionCategory::Compaction => keys(&self.compaction),
        }
    }

    /// Overlay `other` on this bundle. Factory maps merge key by key with
    /// `other` winning; its metadata and logger replace this bundle's; its
    /// defaults are merged over this bundle's defaults.
    pub fn compose(self, other: CapabilityBundle) -> CapabilityBundle {
        let defaults = match (self.defaults, other.defaults) {
            (Some(base), Some(overlay)) => Some(apply_defaults(&overlay, Some(&base))),
            (base, overlay) => overlay.or(base),
        };

        let mut tools = self.tools;
        tools.extend(other.tools);
        let mut blob = self.storage.blob;
        blob.extend(other.storage.blob);
        let mut database = self.storage.database;
        database.extend(other.storage.database);
        let mut cache = self.storage.cache;
        cache.extend(other.storage.cache);
        let mut plugins = self.plugins;
        plugins.extend(other.plugins);
        let mut compaction = self.compaction;
        compaction.extend(other.compaction);

        CapabilityBundle {
            metadata: other.metadata,
            defaults,
            tools,
            storage: StorageFactories {
                blob,
                database,
                cache,
            },
            plugins,
            compaction,
            logger: other.logger,
        }
    }

    /// Runtime shape check run by the loader on every loaded bundle.
    pub fn validate_shape(&self, identifier: &str) -> Result<(), BundleError> {
        let shape = |field: &str, reason: String| BundleError::Shape {
            identifier: identifier.to_string(),
            field: field.to_string(),
            reason,
        };

        if self.metadata.name.trim().is_empty() {
            return Err(shape("metadata.name", "must be a non-empty string".into()));
        }
        if self.metadata.version.trim().is_empty() {
            return Err(shape("metadata.version", "must be a non-empty string".into()));
        }

        for category in ExtensionCategory::ALL {
            for name in self.type_names(category) {
                IdentifierRules::TYPE_NAME
                    .validate(&name)
                    .map_err(|e| shape(&format!("{category}.{name}"), e.to_string()))?;
            }
        }

        if let Some(defaults) = &self.defaults {
            validate_defaults(defaults).map_err(|(field, reason)| shape(&field, reason))?;
        }
        Ok(())
    }
}

fn validate_defaults(defaults: &ConfigDocument) -> Result<(), (String, String)> {
    let require = |key: &str, value: &Value, ok: bool, wanted: &str| {
        if ok {
            Ok(())
        } else {
            Err((
                format!("defaults.{key}"),
                format!("expected {wanted}, found {}", json_kind(value)),
            ))
        }
    };

    for (key, value) in defaults.iter() {
        match key.as_str() {
            "tools" | "plugins" => require(key.as_str(), value, value.is_array(), "an array")?,
            "compaction" | "logger" => require(key.as_str(), value, value.is_object(), "an object")?,
            "storage" => {
                require(key.as_str(), value, value.is_object(), "an object")?;
                for slot in ["blob", "database", "cache"] {
                    if let Some(entry) = value.get(slot) {
                        let path = format!("storage.{slot}");
                        require(path.as_str(), entry, entry.is_object(), "an object")?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

impl fmt::Debug for CapabilityBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityBundle")
            .field("metadata", &self.metadata)
            .field("has_defaults", &self.defaults.is_some())
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("blob", &self.storage.blob.keys().collect::<Vec<_>>())
            .field("database", &self.storage.database.keys().collect::<Vec<_>>())
            .field("cache", &self.storage.cache.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("compaction", &self.compaction.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct CapabilityBundleBuilder {
    bundle: CapabilityBundle,
}

impl CapabilityBundleBuilder {
    pub fn defaults(mut self, defaults: ConfigDocument) -> Self {
        self.bundle.defaults = Some(defaults);
        self
    }

    pub fn tool(mut self, kind: impl Into<String>, factory: Arc<dyn ToolFactory>) -> Self {
        self.bundle.tools.insert(kind.into(), factory);
        self
    }

    pub fn blob(mut self, kind: impl Into<String>, factory: Arc<dyn BlobStoreFactory>) -> Self {
        self.bundle.storage.blob.insert(kind.into(), factory);
        self
    }

    pub fn database(mut self, kind: impl Into<String>, factory: Arc<dyn DatabaseFactory>) -> Self {
        self.bundle.storage.database.insert(kind.into(), factory);
        self
    }

    pub fn cache(mut self, kind: impl Into<String>, factory: Arc<dyn CacheFactory>) -> Self {
        self.bundle.storage.cache.insert(kind.into(), factory);
        self
    }

    pub fn plugin(mut self, kind: impl Into<String>, factory: Arc<dyn PluginFactory>) -> Self {
        self.bundle.plugins.insert(kind.into(), factory);
        self
    }

    pub fn compaction(
        mut self,
        kind: impl Into<String>,
        factory: Arc<dyn CompactionFactory>,
    ) -> Self {
        self.bundle.compaction.insert(kind.into(), factory);
        self
    }

    pub fn build(self) -> CapabilityBundle {
        self.bundle
    }
}
