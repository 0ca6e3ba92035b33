//! Fan-out tool factories: one configuration entry, several tools.

use capstan_core::{IdentifierRules, Tool};
use capstan_resolver::{FactoryError, FactoryResult, ToolFactory, tool_factory};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::filesystem::{PathPolicy, filesystem_tools};
use crate::kv::{DEFAULT_NAMESPACE, kv_tools};
use crate::text::text_tools;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FilesystemToolsConfig {
    pub allowed_paths: Vec<PathBuf>,
    #[serde(default)]
    pub require_write_approval: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextToolsConfig {}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KvToolsConfig {
    #[serde(default)]
    pub namespace: Option<String>,
}

/// `filesystem-tools`: `{ allowedPaths, requireWriteApproval? }`.
pub fn filesystem_tools_factory() -> Arc<dyn ToolFactory> {
    tool_factory(
        |config: FilesystemToolsConfig| -> FactoryResult<Vec<Arc<dyn Tool>>> {
            let policy = PathPolicy::new(&config.allowed_paths)
                .map_err(|e| FactoryError::Other(Box::new(e)))?;
            Ok(filesystem_tools(policy, config.require_write_approval))
        },
    )
}

pub fn text_tools_factory() -> Arc<dyn ToolFactory> {
    tool_factory(|_: TextToolsConfig| -> FactoryResult<Vec<Arc<dyn Tool>>> {
        Ok(text_tools())
    })
}

/// `kv-tools`: `{ namespace? }`, namespace defaulting to `default`.
pub fn kv_tools_factory() -> Arc<dyn ToolFactory> {
    tool_factory(|config: KvToolsConfig| -> FactoryResult<Vec<Arc<dyn Tool>>> {
        let namespace = match config.namespace {
            Some(namespace) => IdentifierRules::TYPE_NAME
                .validate(&namespace)
                .map_err(|e| FactoryError::msg(format!("invalid namespace: {e}")))?,
            None => DEFAULT_NAMESPACE.to_string(),
        };
        Ok(kv_tools(&namespace))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_resolver::Factory;
    use serde_json::json;

    fn names(tools: &[Arc<dyn Tool>]) -> Vec<&str> {
        tools.iter().map(|t| t.name()).collect()
    }

    #[test]
    fn filesystem_group_yields_three_tools() {
        let factory = filesystem_tools_factory();
        let options = factory
            .config_schema()
            .validate(&json!({ "type": "filesystem-tools", "allowedPaths": ["."] }))
            .unwrap();
        let tools = factory.create(options).unwrap();
        assert_eq!(names(&tools), vec!["read_file", "write_file", "list_directory"]);
    }

    #[test]
    fn filesystem_schema_requires_allowed_paths() {
        let factory = filesystem_tools_factory();
        assert!(factory.config_schema().validate(&json!({})).is_err());
        assert!(
            factory
                .config_schema()
                .validate(&json!({ "allowedPaths": ["."], "recursive": true }))
                .is_err()
        );
    }

    #[test]
    fn empty_allowed_paths_fail_at_creation() {
        let err = filesystem_tools_factory()
            .create(json!({ "allowedPaths": [] }))
            .unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn kv_namespace_is_validated() {
        let factory = kv_tools_factory();
        assert_eq!(
            names(&factory.create(json!({})).unwrap()),
            vec!["kv_get", "kv_set", "kv_delete"]
        );
        assert!(factory.create(json!({ "namespace": "bad name" })).is_err());
    }

    #[test]
    fn text_group_takes_no_options() {
        let factory = text_tools_factory();
        assert_eq!(factory.create(json!({})).unwrap().len(), 3);
        assert!(factory.config_schema().validate(&json!({ "x": 1 })).is_err());
    }
}
