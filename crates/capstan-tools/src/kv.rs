//! Key-value tools over the context database.
//!
//! Keys are stored as `kv/<namespace>/<key>`. The database comes from the
//! execution context at call time, never from the factory.

use async_trait::async_trait;
use capstan_core::tool::required_str;
use capstan_core::{ExtensionError, ExtensionResult, Tool, ToolExecutionContext};
use serde_json::{Value, json};
use std::sync::Arc;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone)]
struct KeySpace {
    namespace: Arc<str>,
}

impl KeySpace {
    fn storage_key(&self, tool: &str, input: &Value) -> ExtensionResult<(String, String)> {
        let key = required_str(tool, input, "key")?;
        if key.is_empty() {
            return Err(ExtensionError::invalid_input(tool, "key must not be empty"));
        }
        Ok((key.to_string(), format!("kv/{}/{key}", self.namespace)))
    }
}

fn key_schema(extra: Option<(&str, Value)>) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": { "key": { "type": "string" } },
        "required": ["key"]
    });
    if let Some((name, property)) = extra {
        schema["properties"][name] = property;
        schema["required"] = json!(["key", name]);
    }
    schema
}

pub struct KvGetTool {
    keys: KeySpace,
}

#[async_trait]
impl Tool for KvGetTool {
    fn name(&self) -> &str {
        "kv_get"
    }

    fn description(&self) -> &str {
        "Read a stored value"
    }

    fn input_schema(&self) -> Value {
        key_schema(None)
    }

    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let (key, storage_key) = self.keys.storage_key(self.name(), &input)?;
        let value = ctx.storage.database.get(&storage_key).await?;
        Ok(json!({
            "key": key,
            "found": value.is_some(),
            "value": value.unwrap_or(Value::Null),
        }))
    }
}

pub struct KvSetTool {
    keys: KeySpace,
}

#[async_trait]
impl Tool for KvSetTool {
    fn name(&self) -> &str {
        "kv_set"
    }

    fn description(&self) -> &str {
        "Store a JSON value under a key"
    }

    fn input_schema(&self) -> Value {
        key_schema(Some(("value", json!({}))))
    }

    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let (key, storage_key) = self.keys.storage_key(self.name(), &input)?;
        let value = input
            .get("value")
            .cloned()
            .ok_or_else(|| ExtensionError::invalid_input(self.name(), "missing field 'value'"))?;
        ctx.storage.database.set(&storage_key, value).await?;
        tracing::debug!(key = %storage_key, "Stored kv value");
        Ok(json!({ "key": key, "stored": true }))
    }
}

pub struct KvDeleteTool {
    keys: KeySpace,
}

#[async_trait]
impl Tool for KvDeleteTool {
    fn name(&self) -> &str {
        "kv_delete"
    }

    fn description(&self) -> &str {
        "Delete a stored value"
    }

    fn input_schema(&self) -> Value {
        key_schema(None)
    }

    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let (key, storage_key) = self.keys.storage_key(self.name(), &input)?;
        let deleted = ctx.storage.database.delete(&storage_key).await?;
        Ok(json!({ "key": key, "deleted": deleted }))
    }
}

/// `kv_get`, `kv_set` and `kv_delete` over `namespace`.
pub fn kv_tools(namespace: &str) -> Vec<Arc<dyn Tool>> {
    let keys = KeySpace {
        namespace: Arc::from(namespace),
    };
    vec![
        Arc::new(KvGetTool { keys: keys.clone() }),
        Arc::new(KvSetTool { keys: keys.clone() }),
        Arc::new(KvDeleteTool { keys }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_testing::tool_context;

    fn tool<'a>(tools: &'a [Arc<dyn Tool>], name: &str) -> &'a Arc<dyn Tool> {
        tools.iter().find(|t| t.name() == name).unwrap()
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let tools = kv_tools("notes");
        let ctx = tool_context();

        tool(&tools, "kv_set")
            .execute(json!({ "key": "todo", "value": ["a", "b"] }), &ctx)
            .await
            .unwrap();
        assert_eq!(
            ctx.storage.database.get("kv/notes/todo").await.unwrap(),
            Some(json!(["a", "b"]))
        );

        let got = tool(&tools, "kv_get")
            .execute(json!({ "key": "todo" }), &ctx)
            .await
            .unwrap();
        assert_eq!(got["found"], true);
        assert_eq!(got["value"], json!(["a", "b"]));

        let deleted = tool(&tools, "kv_delete")
            .execute(json!({ "key": "todo" }), &ctx)
            .await
            .unwrap();
        assert_eq!(deleted["deleted"], true);

        let missing = tool(&tools, "kv_get")
            .execute(json!({ "key": "todo" }), &ctx)
            .await
            .unwrap();
        assert_eq!(missing["found"], false);
        assert_eq!(missing["value"], Value::Null);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let ctx = tool_context();
        let a = kv_tools("a");
        let b = kv_tools("b");
        tool(&a, "kv_set")
            .execute(json!({ "key": "k", "value": 1 }), &ctx)
            .await
            .unwrap();
        let from_b = tool(&b, "kv_get").execute(json!({ "key": "k" }), &ctx).await.unwrap();
        assert_eq!(from_b["found"], false);
    }

    #[tokio::test]
    async fn traversal_keys_surface_storage_errors() {
        let tools = kv_tools("n");
        let err = tool(&tools, "kv_set")
            .execute(json!({ "key": "../x", "value": 1 }), &tool_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::Storage(_)));
    }
}
