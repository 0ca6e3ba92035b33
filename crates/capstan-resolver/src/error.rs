//! Error taxonomy for bundle loading, configuration and resolution.
//!
//! Every error here is fatal to agent startup. Nothing is retried: the
//! inputs are already in memory, so a second attempt with the same inputs
//! fails the same way.

use capstan_core::{BoxError, StorageError};
use std::fmt;
use std::path::PathBuf;

/// Extension point an error or factory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionCategory {
    Logger,
    BlobStorage,
    DatabaseStorage,
    CacheStorage,
    Tool,
    Plugin,
    Compaction,
}

impl ExtensionCategory {
    /// Resolution order.
    pub const ALL: [ExtensionCategory; 7] = [
        ExtensionCategory::Logger,
        ExtensionCategory::BlobStorage,
        ExtensionCategory::DatabaseStorage,
        ExtensionCategory::CacheStorage,
        ExtensionCategory::Tool,
        ExtensionCategory::Plugin,
        ExtensionCategory::Compaction,
    ];

    /// Configuration path of the section this category is read from.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionCategory::Logger => "logger",
            ExtensionCategory::BlobStorage => "storage.blob",
            ExtensionCategory::DatabaseStorage => "storage.database",
            ExtensionCategory::CacheStorage => "storage.cache",
            ExtensionCategory::Tool => "tools",
            ExtensionCategory::Plugin => "plugins",
            ExtensionCategory::Compaction => "compaction",
        }
    }

    /// Whether entries of this category honour `enabled: false`.
    pub fn allows_disable(&self) -> bool {
        matches!(self, ExtensionCategory::Tool | ExtensionCategory::Plugin)
    }
}

impl fmt::Display for ExtensionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration entry did not satisfy its factory's schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("expected a configuration object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("does not match {schema}: {source}")]
    Mismatch {
        schema: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A factory's `create` call failed.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(BoxError),
}

impl FactoryError {
    pub fn msg(message: impl Into<String>) -> Self {
        FactoryError::Message(message.into())
    }
}

/// Failures while turning an identifier into a validated bundle.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to load bundle '{identifier}': {source}")]
    Load {
        identifier: String,
        #[source]
        source: BoxError,
    },

    #[error("Bundle '{identifier}' is malformed at '{field}': {reason}")]
    Shape {
        identifier: String,
        field: String,
        reason: String,
    },
}

/// Failures while converting a configuration document into an `AgentConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration root must be an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("Missing required configuration section '{0}'")]
    MissingSection(String),

    #[error("Invalid configuration section '{section}': {source}")]
    InvalidSection {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Unsupported configuration file '{0}', expected .yaml, .yml, .toml or .json")]
    UnsupportedFormat(PathBuf),
}

/// Failures while resolving configuration entries into instances.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(
        "Unknown {category} type '{attempted_type}' in bundle '{bundle}'. Available types: {}",
        list_types(.available_types)
    )]
    UnknownType {
        category: ExtensionCategory,
        attempted_type: String,
        available_types: Vec<String>,
        bundle: String,
    },

    #[error("Invalid {category} configuration for type '{type_name}': {source}")]
    SchemaValidation {
        category: ExtensionCategory,
        type_name: String,
        #[source]
        source: SchemaError,
    },

    #[error("Failed to create {category} '{type_name}': {source}")]
    CreationFailed {
        category: ExtensionCategory,
        type_name: String,
        #[source]
        source: FactoryError,
    },
}

impl ResolveError {
    pub fn category(&self) -> ExtensionCategory {
        match self {
            ResolveError::UnknownType { category, .. }
            | ResolveError::SchemaValidation { category, .. }
            | ResolveError::CreationFailed { category, .. } => *category,
        }
    }
}

fn list_types(types: &[String]) -> String {
    if types.is_empty() {
        "(none)".to_string()
    } else {
        types.join(", ")
    }
}

/// Any failure on the path from bundle identifier to resolved services.
#[derive(Debug, thiserror::Error)]
pub enum CapstanError {
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

pub type CapstanResult<T> = Result<T, CapstanError>;
