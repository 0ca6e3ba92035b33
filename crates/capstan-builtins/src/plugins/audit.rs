//! Audit trail plugin.
//!
//! Every subscribed hook produces one record, logged through the context
//! logger and appended to `audit/<session>` in the context database.

use async_trait::async_trait;
use capstan_core::{
    ExtensionResult, HookPoint, Plugin, PluginExecutionContext, PluginOutcome,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AuditConfig {
    /// Hook points to record. All of them when absent.
    #[serde(default)]
    pub hooks: Option<Vec<HookPoint>>,
    /// Store the hook payload in each record.
    #[serde(default)]
    pub include_payload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub hook: HookPoint,
    pub agent_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug)]
pub struct AuditPlugin {
    hooks: Vec<HookPoint>,
    include_payload: bool,
}

impl AuditPlugin {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            hooks: config.hooks.unwrap_or_else(|| HookPoint::ALL.to_vec()),
            include_payload: config.include_payload,
        }
    }

    pub fn storage_key(session_id: &str) -> String {
        format!("audit/{session_id}")
    }
}

#[async_trait]
impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }

    fn hooks(&self) -> &[HookPoint] {
        &self.hooks
    }

    async fn on_hook(
        &self,
        point: HookPoint,
        payload: &mut Value,
        ctx: &PluginExecutionContext,
    ) -> ExtensionResult<PluginOutcome> {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            hook: point,
            agent_id: ctx.agent.id().to_string(),
            session_id: ctx.session_id.to_string(),
            user_id: ctx.user_id.clone(),
            payload: self.include_payload.then(|| payload.clone()),
        };

        ctx.logger
            .info(&format!("audit {point} session={}", ctx.session_id));
        let value = serde_json::to_value(&record).map_err(capstan_core::StorageError::from)?;
        ctx.storage
            .database
            .append(&Self::storage_key(ctx.session_id.as_str()), value)
            .await?;
        Ok(PluginOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::{SessionId, run_plugin_chain};
    use capstan_testing::{memory_storage, plugin_context};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn appends_one_record_per_hook() {
        let plugin: Arc<dyn Plugin> = Arc::new(AuditPlugin::new(AuditConfig::default()));
        let storage = memory_storage();
        let ctx = plugin_context(storage.clone(), SessionId::parse("s-42").unwrap());

        for point in [HookPoint::BeforeToolCall, HookPoint::AfterToolResult] {
            run_plugin_chain(std::slice::from_ref(&plugin), point, &mut json!({}), &ctx)
                .await
                .unwrap();
        }

        let stored = storage.database.get("audit/s-42").await.unwrap().unwrap();
        let records: Vec<AuditRecord> = serde_json::from_value(stored).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hook, HookPoint::BeforeToolCall);
        assert_eq!(records[1].session_id, "s-42");
        assert!(records[0].payload.is_none());
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn hook_filter_and_payload_capture() {
        let plugin: Arc<dyn Plugin> = Arc::new(AuditPlugin::new(AuditConfig {
            hooks: Some(vec![HookPoint::BeforeResponse]),
            include_payload: true,
        }));
        let storage = memory_storage();
        let ctx = plugin_context(storage.clone(), SessionId::parse("s-1").unwrap());

        run_plugin_chain(
            std::slice::from_ref(&plugin),
            HookPoint::BeforeToolCall,
            &mut json!({}),
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(storage.database.get("audit/s-1").await.unwrap(), None);

        run_plugin_chain(
            std::slice::from_ref(&plugin),
            HookPoint::BeforeResponse,
            &mut json!({ "text": "hi" }),
            &ctx,
        )
        .await
        .unwrap();
        let stored = storage.database.get("audit/s-1").await.unwrap().unwrap();
        assert_eq!(stored[0]["payload"], json!({ "text": "hi" }));
    }
}
