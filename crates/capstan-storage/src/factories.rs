//! Storage factories for the reference backends.

use capstan_core::{BlobStore, Cache, Database, Logger};
use capstan_resolver::{
    BlobStoreFactory, CacheFactory, DatabaseFactory, FactoryError, FactoryResult, blob_factory,
    cache_factory, database_factory,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::local::LocalBlobStore;
use crate::memory::{InMemoryBlobStore, InMemoryCache, InMemoryDatabase};

/// Options for backends that take none.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoOptions {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LocalBlobConfig {
    pub store_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct InMemoryCacheConfig {
    #[serde(default)]
    pub max_entries: Option<usize>,
    #[serde(default)]
    pub default_ttl_secs: Option<u64>,
}

pub fn in_memory_blob_factory() -> Arc<dyn BlobStoreFactory> {
    blob_factory(|_: NoOptions, _logger: Arc<dyn Logger>| async {
        let store: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        FactoryResult::Ok(store)
    })
}

/// `local`: `{ storePath }`. Creates the directory if it does not exist.
pub fn local_blob_factory() -> Arc<dyn BlobStoreFactory> {
    blob_factory(|config: LocalBlobConfig, logger: Arc<dyn Logger>| async move {
        let logger = logger.child("storage.local");
        let store = LocalBlobStore::open(config.store_path, logger).await?;
        let store: Arc<dyn BlobStore> = Arc::new(store);
        FactoryResult::Ok(store)
    })
}

pub fn in_memory_database_factory() -> Arc<dyn DatabaseFactory> {
    database_factory(|_: NoOptions, _logger: Arc<dyn Logger>| async {
        let database: Arc<dyn Database> = Arc::new(InMemoryDatabase::new());
        FactoryResult::Ok(database)
    })
}

/// `in-memory` cache: `{ maxEntries?, defaultTtlSecs? }`. `maxEntries` must be
/// at least 1.
pub fn in_memory_cache_factory() -> Arc<dyn CacheFactory> {
    cache_factory(|config: InMemoryCacheConfig, _logger: Arc<dyn Logger>| async move {
        if config.max_entries == Some(0) {
            return Err(FactoryError::msg("maxEntries must be at least 1"));
        }
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new(
            config.max_entries,
            config.default_ttl_secs.map(Duration::from_secs),
        ));
        FactoryResult::Ok(cache)
    })
}
