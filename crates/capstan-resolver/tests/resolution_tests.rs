//! Resolver behaviour against a fixture bundle: ordering, fan-out,
//! disabled entries and the error taxonomy.

mod common;

use capstan_core::{AgentRef, LogLevel, SessionId};
use capstan_resolver::{
    AgentConfig, ConfigDocument, ExtensionCategory, ResolveError, ResolvedServices, SchemaError,
    apply_defaults, resolve_services,
};
use common::{CallLog, call_log_bundle, fixture_bundle};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

fn merged(config: Value) -> AgentConfig {
    let bundle = fixture_bundle();
    let document = ConfigDocument::from_value(config).unwrap();
    let merged = apply_defaults(&document, bundle.defaults.as_ref());
    AgentConfig::from_document(&merged).unwrap()
}

async fn resolve(config: Value) -> Result<ResolvedServices, ResolveError> {
    resolve_services(&merged(config), &fixture_bundle()).await
}

#[tokio::test]
async fn tool_groups_fan_out_in_declaration_order() {
    let resolved = resolve(json!({
        "tools": [
            { "type": "process-tools" },
            { "type": "filesystem-tools", "allowedPaths": ["."] }
        ]
    }))
    .await
    .unwrap();

    assert_eq!(
        resolved.tool_names(),
        vec!["run_process", "read_file", "write_file", "list_directory"]
    );
}

#[tokio::test]
async fn plugins_keep_declaration_order() {
    let resolved = resolve(json!({
        "plugins": [{ "type": "rate-limit" }, { "type": "audit" }]
    }))
    .await
    .unwrap();
    assert_eq!(resolved.plugin_names(), vec!["rate-limit", "audit"]);
}

#[tokio::test]
async fn disabled_entries_are_neither_validated_nor_resolved() {
    let resolved = resolve(json!({
        "tools": [{ "type": "process-tools", "enabled": false, "badField": 123 }],
        "plugins": [{ "type": "audit", "enabled": false, "unexpected": true }]
    }))
    .await
    .unwrap();
    assert!(resolved.tools.is_empty());
    assert!(resolved.plugins.is_empty());
}

#[tokio::test]
async fn enabled_true_is_stripped_before_validation() {
    let resolved = resolve(json!({
        "tools": [{ "type": "process-tools", "enabled": true }]
    }))
    .await
    .unwrap();
    assert_eq!(resolved.tool_names(), vec!["run_process"]);
}

#[tokio::test]
async fn unknown_tool_type_lists_sorted_alternatives() {
    let err = resolve(json!({ "tools": [{ "type": "ghost-tool" }] }))
        .await
        .unwrap_err();

    match &err {
        ResolveError::UnknownType {
            category,
            attempted_type,
            available_types,
            bundle,
        } => {
            assert_eq!(*category, ExtensionCategory::Tool);
            assert_eq!(attempted_type, "ghost-tool");
            assert_eq!(available_types, &vec!["filesystem-tools", "process-tools"]);
            assert_eq!(bundle, "fixture");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[case::blob(json!({ "storage": { "blob": { "type": "s3" } } }), ExtensionCategory::BlobStorage)]
#[case::cache(json!({ "storage": { "cache": { "type": "redis" } } }), ExtensionCategory::CacheStorage)]
#[case::plugin(json!({ "plugins": [{ "type": "tracer" }] }), ExtensionCategory::Plugin)]
#[case::compaction(json!({ "compaction": { "type": "summarize" } }), ExtensionCategory::Compaction)]
#[tokio::test]
async fn unknown_types_report_their_category(
    #[case] config: Value,
    #[case] expected: ExtensionCategory,
) {
    let err = resolve(config).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnknownType { .. }));
    assert_eq!(err.category(), expected);
}

#[tokio::test]
async fn schema_failures_wrap_the_validation_error() {
    let err = resolve(json!({
        "tools": [{ "type": "filesystem-tools", "allowedPaths": ["."], "recursive": true }]
    }))
    .await
    .unwrap_err();

    match &err {
        ResolveError::SchemaValidation {
            category,
            type_name,
            source: SchemaError::Mismatch { schema, source },
        } => {
            assert_eq!(*category, ExtensionCategory::Tool);
            assert_eq!(type_name, "filesystem-tools");
            assert_eq!(schema, "FilesystemConfig");
            assert!(source.to_string().contains("recursive"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn compaction_ignores_enabled_false() {
    let err = resolve(json!({ "compaction": { "type": "noop", "enabled": false, "x": 1 } }))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::SchemaValidation {
            category: ExtensionCategory::Compaction,
            ..
        }
    ));
}

#[tokio::test]
async fn factory_failures_are_not_replaced_by_defaults() {
    let err = resolve(json!({ "plugins": [{ "type": "audit" }, { "type": "broken" }] }))
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        ResolveError::CreationFailed { category: ExtensionCategory::Plugin, type_name, .. }
            if type_name == "broken"
    ));
    assert!(err.to_string().contains("backend unreachable"));
}

#[tokio::test]
async fn defaults_fill_compaction_and_storage() {
    let resolved = resolve(json!({ "logger": { "level": "debug" } })).await.unwrap();
    assert_eq!(resolved.compaction.name(), "noop");
    assert_eq!(resolved.storage.blob.backend(), "local");
    assert_eq!(resolved.logger.level(), LogLevel::Debug);
}

async fn resolve_logged(log: &CallLog, config: Value) -> Result<ResolvedServices, ResolveError> {
    let bundle = call_log_bundle(log);
    let document = ConfigDocument::from_value(config).unwrap();
    let merged = apply_defaults(&document, bundle.defaults.as_ref());
    resolve_services(&AgentConfig::from_document(&merged).unwrap(), &bundle).await
}

#[tokio::test]
async fn categories_resolve_in_fixed_order() {
    let log = CallLog::default();
    resolve_logged(
        &log,
        json!({
            "logger": { "level": "warn" },
            "plugins": [{ "type": "audit" }],
            "tools": [{ "type": "process-tools" }]
        }),
    )
    .await
    .unwrap();

    assert_eq!(
        log.calls(),
        vec![
            "logger",
            "blob:warn",
            "database:warn",
            "cache:warn",
            "tools:process-tools",
            "plugins:audit",
            "compaction:noop",
        ]
    );
}

#[tokio::test]
async fn storage_factories_receive_the_resolved_logger() {
    let log = CallLog::default();
    let resolved = resolve_logged(&log, json!({ "logger": { "level": "debug" } }))
        .await
        .unwrap();

    let received = log.storage_loggers();
    assert_eq!(received.len(), 3);
    for logger in &received {
        assert_eq!(logger.level(), LogLevel::Debug);
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(logger),
            Arc::as_ptr(&resolved.logger)
        ));
    }
}

#[tokio::test]
async fn blob_failure_stops_before_later_categories() {
    let log = CallLog::default();
    let err = resolve_logged(
        &log,
        json!({
            "storage": { "blob": { "type": "failing" } },
            "tools": [{ "type": "process-tools" }],
            "plugins": [{ "type": "audit" }]
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::CreationFailed {
            category: ExtensionCategory::BlobStorage,
            ..
        }
    ));
    assert_eq!(log.calls(), vec!["logger", "blob:info"]);
}

#[tokio::test]
async fn invalid_logger_options_fail_validation() {
    let err = resolve(json!({ "logger": { "colour": "red" } })).await.unwrap_err();
    assert_eq!(err.category(), ExtensionCategory::Logger);
}

#[tokio::test]
async fn passthrough_sections_survive_merging() {
    let config = merged(json!({ "llm": { "model": "m-1" }, "tools": [] }));
    assert_eq!(config.passthrough_section("llm"), Some(&json!({ "model": "m-1" })));
    assert!(config.passthrough_section("storage").is_none());
}

#[tokio::test]
async fn context_builder_shares_resolved_services() {
    let resolved = resolve(json!({})).await.unwrap();
    let builder = capstan_resolver::ExecutionContextBuilder::new(
        &resolved,
        common_services(),
        AgentRef::detached("agent-1"),
    );

    let tool_ctx = builder.build_tool_context();
    assert_eq!(tool_ctx.agent.id(), "agent-1");
    assert_eq!(tool_ctx.storage.cache.backend(), "memory");

    let plugin_ctx =
        builder.build_plugin_context(SessionId::parse("s-1").unwrap(), Some("u".to_string()));
    assert_eq!(plugin_ctx.session_id.as_str(), "s-1");
    assert_eq!(plugin_ctx.user_id.as_deref(), Some("u"));
    assert!(Arc::ptr_eq(
        &tool_ctx.storage.database,
        &plugin_ctx.storage.database
    ));
}

fn common_services() -> capstan_core::AgentServices {
    use async_trait::async_trait;
    use capstan_core::{
        ApprovalDecision, ApprovalRequest, ApprovalService, ExtensionResult, McpService,
        PromptService, ResourceInfo, ResourceService, SearchHit, SearchService,
    };

    struct Unavailable;

    #[async_trait]
    impl ApprovalService for Unavailable {
        async fn request_approval(&self, _r: ApprovalRequest) -> ExtensionResult<ApprovalDecision> {
            Ok(ApprovalDecision::Approved)
        }
    }

    #[async_trait]
    impl SearchService for Unavailable {
        async fn search(&self, _q: &str, _limit: usize) -> ExtensionResult<Vec<SearchHit>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ResourceService for Unavailable {
        async fn list(&self) -> ExtensionResult<Vec<ResourceInfo>> {
            Ok(Vec::new())
        }

        async fn read(&self, _uri: &str) -> ExtensionResult<Option<String>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl PromptService for Unavailable {
        async fn list(&self) -> ExtensionResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn render(&self, _name: &str, _args: Value) -> ExtensionResult<Option<String>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl McpService for Unavailable {
        async fn list_tools(&self) -> ExtensionResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn call_tool(&self, _s: &str, _t: &str, _a: Value) -> ExtensionResult<Value> {
            Ok(Value::Null)
        }
    }

    let shared = Arc::new(Unavailable);
    capstan_core::AgentServices {
        approval: shared.clone(),
        search: shared.clone(),
        resources: shared.clone(),
        prompts: shared.clone(),
        mcp: shared,
    }
}

fn category_strategy() -> impl Strategy<Value = (ExtensionCategory, &'static str)> {
    prop_oneof![
        Just((ExtensionCategory::Tool, "tools")),
        Just((ExtensionCategory::Plugin, "plugins")),
        Just((ExtensionCategory::Compaction, "compaction")),
        Just((ExtensionCategory::BlobStorage, "blob")),
    ]
}

fn config_with(section: &str, kind: &str) -> Value {
    match section {
        "tools" | "plugins" => json!({ section: [{ "type": kind }] }),
        "blob" => json!({ "storage": { "blob": { "type": kind } } }),
        _ => json!({ section: { "type": kind } }),
    }
}

proptest! {
    #[test]
    fn unknown_types_always_list_exactly_the_bundle_keys(
        (category, section) in category_strategy(),
        kind in "[a-z]{3,10}-x",
    ) {
        let bundle = fixture_bundle();
        let err = tokio_test::block_on(resolve(config_with(section, &kind))).unwrap_err();
        match err {
            ResolveError::UnknownType { category: got, available_types, .. } => {
                prop_assert_eq!(got, category);
                prop_assert_eq!(available_types, bundle.type_names(category));
            }
            other => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn known_plugin_types_always_resolve(index in 0usize..2) {
        let kind = ["audit", "rate-limit"][index];
        let resolved = tokio_test::block_on(resolve(json!({ "plugins": [{ "type": kind }] })))
            .unwrap();
        prop_assert_eq!(resolved.plugin_names(), vec![kind.to_string()]);
    }
}
