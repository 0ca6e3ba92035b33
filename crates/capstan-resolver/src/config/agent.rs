use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ConfigDocument;
use crate::error::ConfigError;
use crate::schema::{ENABLED_KEY, TYPE_KEY, json_kind};

/// Sections the resolver interprets. Everything else is passthrough.
pub const RESOLVER_SECTIONS: [&str; 5] = ["storage", "tools", "plugins", "compaction", "logger"];

/// One `{ type, enabled?, ...fields }` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Factory-specific fields.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ExtensionEntry {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            enabled: None,
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = Some(false);
        self
    }

    /// Only an explicit `enabled: false` disables an entry.
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    /// The entry as its factory schema sees it: `type` plus the
    /// factory-specific fields, with `enabled` stripped.
    pub fn schema_input(&self) -> Value {
        let mut map = self.options.clone();
        map.remove(ENABLED_KEY);
        map.insert(TYPE_KEY.to_string(), Value::String(self.kind.clone()));
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub blob: ExtensionEntry,
    pub database: ExtensionEntry,
    pub cache: ExtensionEntry,
}

/// Merged configuration in the shape the resolver consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub storage: StorageConfig,
    pub tools: Vec<ExtensionEntry>,
    pub plugins: Vec<ExtensionEntry>,
    pub compaction: ExtensionEntry,
    /// Logger options; the bundle has exactly one logger factory, so there
    /// is no `type` to look up.
    pub logger: Map<String, Value>,
    /// Top-level sections handed to the orchestrator untouched.
    pub passthrough: Map<String, Value>,
}

impl AgentConfig {
    pub fn from_document(document: &ConfigDocument) -> Result<Self, ConfigError> {
        let storage = match document.get("storage") {
            Some(Value::Object(storage)) => StorageConfig {
                blob: required_entry(storage.get("blob"), "storage.blob")?,
                database: required_entry(storage.get("database"), "storage.database")?,
                cache: required_entry(storage.get("cache"), "storage.cache")?,
            },
            Some(other) => return Err(not_an_object("storage", other)),
            None => return Err(ConfigError::MissingSection("storage".to_string())),
        };

        let logger = match document.get("logger") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(logger)) => logger.clone(),
            Some(other) => return Err(not_an_object("logger", other)),
        };

        let passthrough = document
            .iter()
            .filter(|(key, _)| !RESOLVER_SECTIONS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            storage,
            tools: entry_list(document.get("tools"), "tools")?,
            plugins: entry_list(document.get("plugins"), "plugins")?,
            compaction: required_entry(document.get("compaction"), "compaction")?,
            logger,
            passthrough,
        })
    }

    pub fn passthrough_section(&self, key: &str) -> Option<&Value> {
        self.passthrough.get(key)
    }
}

fn required_entry(value: Option<&Value>, section: &str) -> Result<ExtensionEntry, ConfigError> {
    match value {
        None | Some(Value::Null) => Err(ConfigError::MissingSection(section.to_string())),
        Some(value) => parse_entry(value, section),
    }
}

fn parse_entry(value: &Value, section: &str) -> Result<ExtensionEntry, ConfigError> {
    if !value.is_object() {
        return Err(not_an_object(section, value));
    }
    ExtensionEntry::deserialize(value).map_err(|source| ConfigError::InvalidSection {
        section: section.to_string(),
        source,
    })
}

fn entry_list(value: Option<&Value>, section: &str) -> Result<Vec<ExtensionEntry>, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_entry(item, &format!("{section}[{index}]")))
            .collect(),
        Some(other) => Err(ConfigError::InvalidSection {
            section: section.to_string(),
            source: serde::de::Error::custom(format!(
                "expected an array, found {}",
                json_kind(other)
            )),
        }),
    }
}

fn not_an_object(section: &str, value: &Value) -> ConfigError {
    ConfigError::InvalidSection {
        section: section.to_string(),
        source: serde::de::Error::custom(format!(
            "expected an object, found {}",
            json_kind(value)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn storage() -> Value {
        json!({
            "blob": { "type": "in-memory" },
            "database": { "type": "in-memory" },
            "cache": { "type": "in-memory" }
        })
    }

    fn document(value: Value) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    #[test]
    fn splits_resolver_sections_from_passthrough() {
        let config = AgentConfig::from_document(&document(json!({
            "storage": storage(),
            "tools": [{ "type": "filesystem-tools", "allowedPaths": ["."] }],
            "compaction": { "type": "noop" },
            "llm": { "model": "m-1" },
            "name": "helper"
        })))
        .unwrap();

        assert_eq!(config.tools.len(), 1);
        assert_eq!(config.tools[0].kind, "filesystem-tools");
        assert_eq!(config.tools[0].options["allowedPaths"], json!(["."]));
        assert!(config.plugins.is_empty());
        assert!(config.logger.is_empty());
        assert_eq!(config.passthrough.len(), 2);
        assert_eq!(config.passthrough_section("llm"), Some(&json!({ "model": "m-1" })));
    }

    #[rstest]
    #[case::storage(json!({ "compaction": { "type": "noop" } }), "storage")]
    #[case::blob(
        json!({ "storage": { "database": {"type": "x"}, "cache": {"type": "x"} }, "compaction": { "type": "noop" } }),
        "storage.blob"
    )]
    #[case::compaction(json!({ "storage": storage() }), "compaction")]
    fn reports_missing_sections(#[case] raw: Value, #[case] section: &str) {
        let err = AgentConfig::from_document(&document(raw)).unwrap_err();
        match err {
            ConfigError::MissingSection(missing) => assert_eq!(missing, section),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_entries_are_located_by_index() {
        let err = AgentConfig::from_document(&document(json!({
            "storage": storage(),
            "compaction": { "type": "noop" },
            "tools": [{ "type": "text-tools" }, { "allowedPaths": [] }]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("'tools[1]'"), "{err}");
    }

    #[test]
    fn enabled_is_kept_apart_from_options() {
        let entry: ExtensionEntry = serde_json::from_value(json!({
            "type": "process-tools",
            "enabled": false,
            "badField": 123
        }))
        .unwrap();
        assert!(!entry.is_enabled());
        assert_eq!(
            entry.schema_input(),
            json!({ "type": "process-tools", "badField": 123 })
        );

        assert!(ExtensionEntry::new("audit").is_enabled());
        assert!(!ExtensionEntry::new("audit").disabled().is_enabled());
    }
}
