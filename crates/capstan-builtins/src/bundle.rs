//! The `builtin` capability bundle.

use capstan_resolver::{BundleMetadata, CapabilityBundle, ConfigDocument, StaticBundleSource};
use capstan_storage::{
    in_memory_blob_factory, in_memory_cache_factory, in_memory_database_factory,
    local_blob_factory,
};
use capstan_tools::{filesystem_tools_factory, kv_tools_factory, text_tools_factory};
use serde_json::json;

use crate::compaction::{noop_compaction_factory, sliding_window_compaction_factory};
use crate::logger::tracing_logger_factory;
use crate::plugins::{audit_plugin_factory, rate_limit_plugin_factory};

pub const BUILTIN_BUNDLE: &str = "builtin";
pub const BUILTIN_VERSION: &str = "0.1.0";

/// Defaults merged under every configuration resolved against the builtin
/// bundle.
pub fn builtin_defaults() -> ConfigDocument {
    let defaults = json!({
        "storage": {
            "blob": { "type": "in-memory" },
            "database": { "type": "in-memory" },
            "cache": { "type": "in-memory" }
        },
        "compaction": { "type": "noop" },
        "logger": { "level": "info" },
        "tools": [{ "type": "text-tools" }]
    });
    match defaults {
        serde_json::Value::Object(map) => ConfigDocument::from_map(map),
        _ => ConfigDocument::new(),
    }
}

pub fn builtin_bundle() -> CapabilityBundle {
    let metadata = BundleMetadata::new(
        BUILTIN_BUNDLE,
        BUILTIN_VERSION,
        "Reference extensions backed by memory and the local filesystem",
    )
    .with_target("native")
    .with_constraint("single-process");

    CapabilityBundle::builder(metadata, tracing_logger_factory())
        .defaults(builtin_defaults())
        .tool("filesystem-tools", filesystem_tools_factory())
        .tool("text-tools", text_tools_factory())
        .tool("kv-tools", kv_tools_factory())
        .blob("in-memory", in_memory_blob_factory())
        .blob("local", local_blob_factory())
        .database("in-memory", in_memory_database_factory())
        .cache("in-memory", in_memory_cache_factory())
        .plugin("audit", audit_plugin_factory())
        .plugin("rate-limit", rate_limit_plugin_factory())
        .compaction("noop", noop_compaction_factory())
        .compaction("sliding-window", sliding_window_compaction_factory())
        .build()
}

/// Source serving [`builtin_bundle`] under [`BUILTIN_BUNDLE`].
pub fn builtin_source() -> StaticBundleSource {
    StaticBundleSource::new().with_bundle(BUILTIN_BUNDLE, builtin_bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_resolver::ExtensionCategory;

    #[test]
    fn bundle_passes_its_own_shape_check() {
        let bundle = builtin_bundle();
        bundle.validate_shape(BUILTIN_BUNDLE).unwrap();
        assert_eq!(bundle.metadata.version, BUILTIN_VERSION);
        assert_eq!(
            bundle.type_names(ExtensionCategory::Tool),
            vec!["filesystem-tools", "kv-tools", "text-tools"]
        );
        assert_eq!(
            bundle.type_names(ExtensionCategory::BlobStorage),
            vec!["in-memory", "local"]
        );
        assert_eq!(
            bundle.type_names(ExtensionCategory::Compaction),
            vec!["noop", "sliding-window"]
        );
    }

    #[test]
    fn defaults_cover_every_required_section() {
        let defaults = builtin_defaults();
        for key in ["storage", "compaction", "logger", "tools"] {
            assert!(defaults.contains(key), "missing default section {key}");
        }
    }
}
