//! # Text Processing Tools

use async_trait::async_trait;
use capstan_core::tool::required_str;
use capstan_core::{ExtensionResult, Tool, ToolExecutionContext};
use serde_json::{Value, json};
use std::sync::Arc;

fn text_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "text": { "type": "string" } },
        "required": ["text"]
    })
}

#[derive(Debug, Default)]
pub struct TextUppercaseTool;

#[async_trait]
impl Tool for TextUppercaseTool {
    fn name(&self) -> &str {
        "text_uppercase"
    }

    fn description(&self) -> &str {
        "Convert text to upper case"
    }

    fn input_schema(&self) -> Value {
        text_schema()
    }

    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let text = required_str(self.name(), &input, "text")?;
        Ok(json!({ "original": text, "result": text.to_uppercase() }))
    }
}

#[derive(Debug, Default)]
pub struct TextReverseTool;

#[async_trait]
impl Tool for TextReverseTool {
    fn name(&self) -> &str {
        "text_reverse"
    }

    fn description(&self) -> &str {
        "Reverse text by characters"
    }

    fn input_schema(&self) -> Value {
        text_schema()
    }

    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let text = required_str(self.name(), &input, "text")?;
        let reversed: String = text.chars().rev().collect();
        Ok(json!({ "original": text, "result": reversed }))
    }
}

/// Splits on `delimiter` (default: whitespace), keeping at most `limit` parts.
#[derive(Debug, Default)]
pub struct TextSplitTool;

#[async_trait]
impl Tool for TextSplitTool {
    fn name(&self) -> &str {
        "text_split"
    }

    fn description(&self) -> &str {
        "Split text on a delimiter, or on whitespace when none is given"
    }

    fn input_schema(&self) -> Value {
        let mut schema = text_schema();
        schema["properties"]["delimiter"] = json!({ "type": "string" });
        schema["properties"]["limit"] = json!({ "type": "integer", "minimum": 1 });
        schema
    }

    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let text = required_str(self.name(), &input, "text")?;
        let delimiter = input
            .get("delimiter")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty());
        let limit = input
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(usize::MAX);

        let parts: Vec<&str> = match delimiter {
            Some(delimiter) => text.split(delimiter).take(limit).collect(),
            None => text.split_whitespace().take(limit).collect(),
        };
        Ok(json!({ "parts": parts, "count": parts.len() }))
    }
}

pub fn text_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(TextUppercaseTool),
        Arc::new(TextReverseTool),
        Arc::new(TextSplitTool),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::ExtensionError;
    use capstan_testing::tool_context;
    use rstest::rstest;

    #[tokio::test]
    async fn uppercase_and_reverse() {
        let ctx = tool_context();
        let upper = TextUppercaseTool.execute(json!({ "text": "abc" }), &ctx).await.unwrap();
        assert_eq!(upper["result"], "ABC");

        let reversed = TextReverseTool.execute(json!({ "text": "héllo" }), &ctx).await.unwrap();
        assert_eq!(reversed["result"], "olléh");
    }

    #[rstest]
    #[case(json!({ "text": "a b  c" }), vec!["a", "b", "c"])]
    #[case(json!({ "text": "a,b,c", "delimiter": "," }), vec!["a", "b", "c"])]
    #[case(json!({ "text": "a,b,c", "delimiter": ",", "limit": 2 }), vec!["a", "b"])]
    #[tokio::test]
    async fn split_variants(#[case] input: Value, #[case] expected: Vec<&str>) {
        let output = TextSplitTool.execute(input, &tool_context()).await.unwrap();
        assert_eq!(output["parts"], json!(expected));
        assert_eq!(output["count"], expected.len());
    }

    #[tokio::test]
    async fn missing_text_is_invalid_input() {
        let err = TextUppercaseTool
            .execute(json!({ "txt": "x" }), &tool_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidInput { .. }));
    }
}
