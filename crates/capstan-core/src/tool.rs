//! Tool contract.
//!
//! Tools are constructed by a `ToolFactory` from configuration alone and only
//! see orchestrator services through the [`ToolExecutionContext`] passed to
//! each [`Tool::execute`] call.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;

use crate::context::ToolExecutionContext;
use crate::error::{ExtensionError, ExtensionResult};

/// An invocable capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the input object.
    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    /// Run the tool. The context is built fresh for this invocation and must
    /// not be retained after the call returns.
    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> ExtensionResult<Value>;
}

impl fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

/// Read a required string field from a tool input object.
pub fn required_str<'a>(tool: &str, input: &'a Value, field: &str) -> ExtensionResult<&'a str> {
    input.get(field).and_then(Value::as_str).ok_or_else(|| {
        ExtensionError::invalid_input(tool, format!("missing string field '{field}'"))
    })
}
