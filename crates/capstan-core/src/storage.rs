//! Storage contracts for the three independent storage slots.
//!
//! A bundle provides separate factory namespaces for blob, database and
//! cache backends; each backend owns its own concurrency discipline.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StorageResult;

/// Metadata describing a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
}

/// Opaque binary object storage (attachments, generated files).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend type string, for diagnostics.
    fn backend(&self) -> &str;

    async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>)
    -> StorageResult<BlobInfo>;

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// List blob metadata whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<BlobInfo>>;

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Durable structured key-value storage (sessions, audit logs, tool state).
#[async_trait]
pub trait Database: Send + Sync {
    fn backend(&self) -> &str;

    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Keys starting with `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Append `value` to the JSON array stored at `key`, creating it if absent.
    async fn append(&self, key: &str, value: Value) -> StorageResult<usize>;
}

/// Ephemeral key-value storage with optional expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    fn backend(&self) -> &str;

    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> StorageResult<()>;

    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Atomically add `delta` to the integer at `key` (missing counts as 0).
    async fn increment(&self, key: &str, delta: i64, ttl: Option<Duration>) -> StorageResult<i64>;
}

/// The three resolved storage backends, shared by reference across every
/// execution context.
#[derive(Clone)]
pub struct StorageServices {
    pub blob: Arc<dyn BlobStore>,
    pub database: Arc<dyn Database>,
    pub cache: Arc<dyn Cache>,
}

impl fmt::Debug for StorageServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageServices")
            .field("blob", &self.blob.backend())
            .field("database", &self.database.backend())
            .field("cache", &self.cache.backend())
            .finish()
    }
}
