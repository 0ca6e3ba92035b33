//! Bundle loading.
//!
//! How an identifier becomes a loadable module depends on the host (a
//! statically linked table, a plugin directory, a test fixture), so the
//! loader takes a [`BundleSource`] strategy and only validates what it
//! returns.

use async_trait::async_trait;
use capstan_core::BoxError;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::bundle::CapabilityBundle;
use crate::error::BundleError;

/// Whatever a source produced for an identifier, before shape checking.
pub type LoadedModule = Box<dyn Any + Send>;

/// A function producing a fresh bundle value.
pub type BundleConstructor = fn() -> CapabilityBundle;

/// Host-supplied strategy turning an identifier into a module.
#[async_trait]
pub trait BundleSource: Send + Sync {
    async fn load(&self, identifier: &str) -> Result<LoadedModule, BoxError>;
}

/// Identifiers mapped to bundle constructors, owned by the host.
///
/// Every load calls the constructor again, so two loads of the same
/// identifier never share mutable state.
#[derive(Debug, Clone, Default)]
pub struct StaticBundleSource {
    constructors: HashMap<String, BundleConstructor>,
}

impl StaticBundleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, identifier: impl Into<String>, constructor: BundleConstructor) -> Self {
        self.constructors.insert(identifier.into(), constructor);
        self
    }

    /// Known identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl BundleSource for StaticBundleSource {
    async fn load(&self, identifier: &str) -> Result<LoadedModule, BoxError> {
        match self.constructors.get(identifier) {
            Some(constructor) => Ok(Box::new(constructor())),
            None => Err(format!(
                "no bundle registered under '{identifier}' (known: {})",
                self.identifiers().join(", ")
            )
            .into()),
        }
    }
}

/// Adapts an async closure into a [`BundleSource`].
pub struct FnBundleSource<F> {
    load: F,
}

impl<F, Fut> FnBundleSource<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LoadedModule, BoxError>> + Send,
{
    pub fn new(load: F) -> Self {
        Self { load }
    }
}

#[async_trait]
impl<F, Fut> BundleSource for FnBundleSource<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LoadedModule, BoxError>> + Send,
{
    async fn load(&self, identifier: &str) -> Result<LoadedModule, BoxError> {
        (self.load)(identifier.to_string()).await
    }
}

#[derive(Clone)]
pub struct BundleLoader {
    source: Arc<dyn BundleSource>,
}

impl BundleLoader {
    pub fn new(source: impl BundleSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_arc(source: Arc<dyn BundleSource>) -> Self {
        Self { source }
    }

    /// Load `identifier` through the source and shape-check the result.
    pub async fn load_bundle(&self, identifier: &str) -> Result<CapabilityBundle, BundleError> {
        let module = self
            .source
            .load(identifier)
            .await
            .map_err(|source| BundleError::Load {
                identifier: identifier.to_string(),
                source,
            })?;

        let bundle = into_bundle(module).ok_or_else(|| BundleError::Shape {
            identifier: identifier.to_string(),
            field: "<module>".to_string(),
            reason: "expected a CapabilityBundle, Arc<CapabilityBundle> or bundle constructor"
                .to_string(),
        })?;
        bundle.validate_shape(identifier)?;

        tracing::info!(
            identifier,
            bundle = %bundle.metadata.name,
            version = %bundle.metadata.version,
            tools = bundle.tools.len(),
            plugins = bundle.plugins.len(),
            "Loaded capability bundle"
        );
        Ok(bundle)
    }
}

impl std::fmt::Debug for BundleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleLoader").finish_non_exhaustive()
    }
}

fn into_bundle(module: LoadedModule) -> Option<CapabilityBundle> {
    let module = match module.downcast::<CapabilityBundle>() {
        Ok(bundle) => return Some(*bundle),
        Err(other) => other,
    };
    let module = match module.downcast::<Arc<CapabilityBundle>>() {
        Ok(shared) => return Some(CapabilityBundle::clone(&shared)),
        Err(other) => other,
    };
    module
        .downcast::<BundleConstructor>()
        .ok()
        .map(|constructor| constructor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleMetadata;
    use crate::error::ExtensionCategory;
    use crate::factory::{FactoryResult, logger_factory};
    use capstan_core::{LogLevel, Logger};
    use serde_json::Value;

    struct NullLogger;

    impl Logger for NullLogger {
        fn log(&self, _level: LogLevel, _message: &str) {}

        fn level(&self) -> LogLevel {
            LogLevel::Info
        }

        fn child(&self, _component: &str) -> Arc<dyn Logger> {
            Arc::new(NullLogger)
        }
    }

    fn minimal() -> CapabilityBundle {
        CapabilityBundle::builder(
            BundleMetadata::new("minimal", "0.1.0", "bare bundle"),
            logger_factory(|_: Value| -> FactoryResult<Arc<dyn Logger>> { Ok(Arc::new(NullLogger)) }),
        )
        .build()
    }

    fn nameless() -> CapabilityBundle {
        let mut bundle = minimal();
        bundle.metadata.version = String::new();
        bundle
    }

    #[tokio::test]
    async fn static_source_loads_registered_bundles() {
        let loader = BundleLoader::new(StaticBundleSource::new().with_bundle("minimal", minimal));
        let bundle = loader.load_bundle("minimal").await.unwrap();
        assert_eq!(bundle.name(), "minimal");
    }

    #[tokio::test]
    async fn unknown_identifier_is_a_load_error() {
        let loader = BundleLoader::new(StaticBundleSource::new().with_bundle("minimal", minimal));
        let err = loader.load_bundle("missing").await.unwrap_err();
        assert!(matches!(err, BundleError::Load { .. }));
        assert!(err.to_string().contains("known: minimal"));
    }

    #[tokio::test]
    async fn accepts_shared_bundles_and_constructors() {
        let shared = BundleLoader::new(FnBundleSource::new(|_id: String| async {
            Ok(Box::new(Arc::new(minimal())) as LoadedModule)
        }));
        assert_eq!(shared.load_bundle("x").await.unwrap().name(), "minimal");

        let ctor = BundleLoader::new(FnBundleSource::new(|_id: String| async {
            Ok(Box::new(minimal as BundleConstructor) as LoadedModule)
        }));
        assert_eq!(ctor.load_bundle("x").await.unwrap().name(), "minimal");
    }

    #[tokio::test]
    async fn foreign_module_is_a_shape_error() {
        let loader = BundleLoader::new(FnBundleSource::new(|_id: String| async {
            Ok(Box::new("not a bundle") as LoadedModule)
        }));
        let err = loader.load_bundle("odd").await.unwrap_err();
        assert!(matches!(&err, BundleError::Shape { field, .. } if field == "<module>"));
    }

    #[tokio::test]
    async fn malformed_metadata_is_rejected() {
        let loader = BundleLoader::new(StaticBundleSource::new().with_bundle("broken", nameless));
        let err = loader.load_bundle("broken").await.unwrap_err();
        assert!(err.to_string().contains("metadata.version"));
    }

    #[tokio::test]
    async fn repeated_loads_are_independent() {
        let loader = BundleLoader::new(StaticBundleSource::new().with_bundle("minimal", minimal));
        let mut first = loader.load_bundle("minimal").await.unwrap();
        first.metadata.description = "changed".to_string();
        let second = loader.load_bundle("minimal").await.unwrap();
        assert_eq!(second.metadata.description, "bare bundle");
        assert_eq!(
            first.type_names(ExtensionCategory::Tool),
            second.type_names(ExtensionCategory::Tool)
        );
    }
}
