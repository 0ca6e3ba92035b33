//! Factory contracts, one trait per extension point.
//!
//! Factories map validated configuration to instances and nothing else. No
//! factory signature accepts the orchestrator or any of its services; the
//! only auxiliary argument in the whole family is the resolved logger given
//! to storage factories. Runtime services reach extensions later, through
//! execution contexts.
//!
//! Keeping each extension point on its own trait makes the bundle's factory
//! namespaces distinct at compile time: a blob factory cannot be inserted
//! where a database factory is expected.

use async_trait::async_trait;
use capstan_core::{BlobStore, Cache, CompactionStrategy, Database, Logger, Plugin, Tool};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::FactoryError;
use crate::schema::ConfigSchema;

pub type FactoryResult<T> = Result<T, FactoryError>;

/// Behaviour shared by every factory: it carries the schema its
/// configuration must satisfy.
pub trait Factory: Send + Sync {
    fn config_schema(&self) -> &ConfigSchema;
}

/// Builds one or more tools from a single entry (fan-out).
pub trait ToolFactory: Factory {
    fn create(&self, config: Value) -> FactoryResult<Vec<Arc<dyn Tool>>>;
}

pub trait PluginFactory: Factory {
    fn create(&self, config: Value) -> FactoryResult<Arc<dyn Plugin>>;
}

pub trait CompactionFactory: Factory {
    fn create(&self, config: Value) -> FactoryResult<Arc<dyn CompactionStrategy>>;
}

pub trait LoggerFactory: Factory {
    fn create(&self, config: Value) -> FactoryResult<Arc<dyn Logger>>;
}

/// Storage factories may open connections, so creation is async.
#[async_trait]
pub trait BlobStoreFactory: Factory {
    async fn create(&self, config: Value, logger: Arc<dyn Logger>)
    -> FactoryResult<Arc<dyn BlobStore>>;
}

#[async_trait]
pub trait DatabaseFactory: Factory {
    async fn create(&self, config: Value, logger: Arc<dyn Logger>)
    -> FactoryResult<Arc<dyn Database>>;
}

#[async_trait]
pub trait CacheFactory: Factory {
    async fn create(&self, config: Value, logger: Arc<dyn Logger>) -> FactoryResult<Arc<dyn Cache>>;
}

/// Factory built from a closure over a typed configuration struct `C`.
///
/// The schema is [`ConfigSchema::of::<C>`], and `create` hands the closure an
/// already-deserialized `C`.
pub struct TypedFactory<C, F> {
    schema: ConfigSchema,
    build: F,
    _config: PhantomData<fn() -> C>,
}

impl<C, F> TypedFactory<C, F>
where
    C: DeserializeOwned + 'static,
{
    pub fn new(build: F) -> Self {
        Self {
            schema: ConfigSchema::of::<C>(),
            build,
            _config: PhantomData,
        }
    }

    /// Replace the derived schema, e.g. with [`ConfigSchema::permissive`].
    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.schema = schema;
        self
    }

    fn parse(config: Value) -> FactoryResult<C> {
        Ok(serde_json::from_value(config)?)
    }
}

impl<C, F> Factory for TypedFactory<C, F>
where
    F: Send + Sync,
{
    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }
}

impl<C, F> ToolFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Vec<Arc<dyn Tool>>> + Send + Sync,
{
    fn create(&self, config: Value) -> FactoryResult<Vec<Arc<dyn Tool>>> {
        (self.build)(Self::parse(config)?)
    }
}

impl<C, F> PluginFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Arc<dyn Plugin>> + Send + Sync,
{
    fn create(&self, config: Value) -> FactoryResult<Arc<dyn Plugin>> {
        (self.build)(Self::parse(config)?)
    }
}

impl<C, F> CompactionFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Arc<dyn CompactionStrategy>> + Send + Sync,
{
    fn create(&self, config: Value) -> FactoryResult<Arc<dyn CompactionStrategy>> {
        (self.build)(Self::parse(config)?)
    }
}

impl<C, F> LoggerFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Arc<dyn Logger>> + Send + Sync,
{
    fn create(&self, config: Value) -> FactoryResult<Arc<dyn Logger>> {
        (self.build)(Self::parse(config)?)
    }
}

#[async_trait]
impl<C, F, Fut> BlobStoreFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + Send + 'static,
    F: Fn(C, Arc<dyn Logger>) -> Fut + Send + Sync,
    Fut: Future<Output = FactoryResult<Arc<dyn BlobStore>>> + Send + 'static,
{
    async fn create(
        &self,
        config: Value,
        logger: Arc<dyn Logger>,
    ) -> FactoryResult<Arc<dyn BlobStore>> {
        let config = Self::parse(config)?;
        (self.build)(config, logger).await
    }
}

#[async_trait]
impl<C, F, Fut> DatabaseFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + Send + 'static,
    F: Fn(C, Arc<dyn Logger>) -> Fut + Send + Sync,
    Fut: Future<Output = FactoryResult<Arc<dyn Database>>> + Send + 'static,
{
    async fn create(
        &self,
        config: Value,
        logger: Arc<dyn Logger>,
    ) -> FactoryResult<Arc<dyn Database>> {
        let config = Self::parse(config)?;
        (self.build)(config, logger).await
    }
}

#[async_trait]
impl<C, F, Fut> CacheFactory for TypedFactory<C, F>
where
    C: DeserializeOwned + Send + 'static,
    F: Fn(C, Arc<dyn Logger>) -> Fut + Send + Sync,
    Fut: Future<Output = FactoryResult<Arc<dyn Cache>>> + Send + 'static,
{
    async fn create(&self, config: Value, logger: Arc<dyn Logger>) -> FactoryResult<Arc<dyn Cache>> {
        let config = Self::parse(config)?;
        (self.build)(config, logger).await
    }
}

pub fn tool_factory<C, F>(build: F) -> Arc<dyn ToolFactory>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Vec<Arc<dyn Tool>>> + Send + Sync + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}

pub fn plugin_factory<C, F>(build: F) -> Arc<dyn PluginFactory>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Arc<dyn Plugin>> + Send + Sync + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}

pub fn compaction_factory<C, F>(build: F) -> Arc<dyn CompactionFactory>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Arc<dyn CompactionStrategy>> + Send + Sync + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}

pub fn logger_factory<C, F>(build: F) -> Arc<dyn LoggerFactory>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) -> FactoryResult<Arc<dyn Logger>> + Send + Sync + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}

pub fn blob_factory<C, F, Fut>(build: F) -> Arc<dyn BlobStoreFactory>
where
    C: DeserializeOwned + Send + 'static,
    F: Fn(C, Arc<dyn Logger>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FactoryResult<Arc<dyn BlobStore>>> + Send + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}

pub fn database_factory<C, F, Fut>(build: F) -> Arc<dyn DatabaseFactory>
where
    C: DeserializeOwned + Send + 'static,
    F: Fn(C, Arc<dyn Logger>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FactoryResult<Arc<dyn Database>>> + Send + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}

pub fn cache_factory<C, F, Fut>(build: F) -> Arc<dyn CacheFactory>
where
    C: DeserializeOwned + Send + 'static,
    F: Fn(C, Arc<dyn Logger>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FactoryResult<Arc<dyn Cache>>> + Send + 'static,
{
    Arc::new(TypedFactory::<C, F>::new(build))
}
