//! In-memory storage backends.
//!
//! All three are backed by [`DashMap`], so a single instance can be shared by
//! every concurrent tool and plugin invocation without an outer lock.
//! Contents are lost when the process exits.

use async_trait::async_trait;
use capstan_core::{
    BlobInfo, BlobStore, Cache, Database, IdentifierRules, StorageError, StorageResult,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub(crate) const BACKEND: &str = "in-memory";

pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    IdentifierRules::STORAGE_KEY.validate(key)?;
    Ok(())
}

struct StoredBlob {
    data: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: DashMap<String, StoredBlob>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<BlobInfo> {
        check_key(key)?;
        let info = BlobInfo {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: content_type.map(str::to_string),
        };
        self.blobs.insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: info.content_type.clone(),
            },
        );
        Ok(info)
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_key(key)?;
        Ok(self.blobs.get(key).map(|blob| blob.data.clone()))
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.blobs.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<BlobInfo>> {
        let mut infos: Vec<BlobInfo> = self
            .blobs
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| BlobInfo {
                key: entry.key().clone(),
                size: entry.data.len() as u64,
                content_type: entry.content_type.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.blobs.contains_key(key))
    }
}

#[derive(Default)]
pub struct InMemoryDatabase {
    records: DashMap<String, Value>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        check_key(key)?;
        Ok(self.records.get(key).map(|record| record.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        check_key(key)?;
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.records.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .records
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn append(&self, key: &str, value: Value) -> StorageResult<usize> {
        check_key(key)?;
        match self.records.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Value::Array(vec![value]));
                Ok(1)
            }
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Value::Array(items) => {
                    items.push(value);
                    Ok(items.len())
                }
                _ => Err(StorageError::operation_failed(
                    BACKEND,
                    "append to",
                    key,
                    "existing value is not an array",
                )),
            },
        }
    }
}

struct CacheEntry {
    value: Value,
    /// Insertion sequence number, for oldest-first eviction.
    sequence: u64,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// A TTL too large to represent as an `Instant` never expires.
    fn new(value: Value, sequence: u64, ttl: Option<Duration>) -> Self {
        Self {
            value,
            sequence,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Bounded in-memory cache with per-entry expiry.
///
/// When `max_entries` is reached, expired entries are purged first and then
/// the oldest insertion is evicted. Eviction and insertion are separate
/// steps, so concurrent writers may briefly exceed the cap.
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    next_sequence: AtomicU64,
    max_entries: Option<usize>,
    default_ttl: Option<Duration>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl InMemoryCache {
    pub fn new(max_entries: Option<usize>, default_ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            max_entries,
            default_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn make_room(&self, incoming: &str) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.contains_key(incoming) || self.entries.len() < max {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        if self.entries.len() < max {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.sequence)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            tracing::trace!(key = %key, "Evicted oldest cache entry");
        }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        check_key(key)?;
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> StorageResult<()> {
        check_key(key)?;
        self.make_room(key);
        self.entries.insert(
            key.to_string(),
            CacheEntry::new(value, self.sequence(), ttl.or(self.default_ttl)),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }

    async fn increment(&self, key: &str, delta: i64, ttl: Option<Duration>) -> StorageResult<i64> {
        check_key(key)?;
        self.make_room(key);
        let now = Instant::now();
        let ttl = ttl.or(self.default_ttl);

        let sequence = self.sequence();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::new(Value::from(0), sequence, ttl));
        if entry.is_expired(now) {
            *entry = CacheEntry::new(Value::from(0), sequence, ttl);
        }

        let current = entry.value.as_i64().ok_or_else(|| {
            StorageError::operation_failed(BACKEND, "increment", key, "value is not an integer")
        })?;
        let next = current.checked_add(delta).ok_or_else(|| {
            StorageError::operation_failed(BACKEND, "increment", key, "integer overflow")
        })?;
        entry.value = Value::from(next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn blob_round_trip_and_prefix_listing() {
        let store = InMemoryBlobStore::new();
        store.put("reports/b.txt", b"bb".to_vec(), Some("text/plain")).await.unwrap();
        store.put("reports/a.txt", b"a".to_vec(), None).await.unwrap();
        store.put("other.bin", vec![0; 4], None).await.unwrap();

        assert_eq!(store.get("reports/a.txt").await.unwrap(), Some(b"a".to_vec()));
        let listed = store.list("reports/").await.unwrap();
        assert_eq!(
            listed.iter().map(|i| i.key.as_str()).collect::<Vec<_>>(),
            vec!["reports/a.txt", "reports/b.txt"]
        );
        assert_eq!(listed[1].content_type.as_deref(), Some("text/plain"));

        assert!(store.delete("other.bin").await.unwrap());
        assert!(!store.exists("other.bin").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let store = InMemoryBlobStore::new();
        let err = store.put("../escape", vec![], None).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn database_append_builds_arrays() {
        let db = InMemoryDatabase::new();
        assert_eq!(db.append("audit:s1", json!({ "n": 1 })).await.unwrap(), 1);
        assert_eq!(db.append("audit:s1", json!({ "n": 2 })).await.unwrap(), 2);
        assert_eq!(
            db.get("audit:s1").await.unwrap(),
            Some(json!([{ "n": 1 }, { "n": 2 }]))
        );

        db.set("scalar", json!(3)).await.unwrap();
        assert!(db.append("scalar", json!(4)).await.is_err());
        assert_eq!(db.list_keys("audit:").await.unwrap(), vec!["audit:s1"]);
    }

    #[tokio::test]
    async fn cache_entries_expire() {
        let cache = InMemoryCache::default();
        cache
            .set("short", json!("v"), Some(Duration::from_millis(0)))
            .await
            .unwrap();
        cache.set("long", json!("v"), None).await.unwrap();
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn unrepresentable_ttl_never_expires() {
        let forever = Duration::from_secs(u64::MAX);
        let cache = InMemoryCache::new(None, Some(forever));
        cache.set("k", json!(1), None).await.unwrap();
        cache.set("explicit", json!(2), Some(forever)).await.unwrap();
        assert_eq!(cache.increment("n", 5, Some(forever)).await.unwrap(), 5);

        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(cache.get("explicit").await.unwrap(), Some(json!(2)));
        assert_eq!(cache.get("n").await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn cache_evicts_oldest_when_full() {
        let cache = InMemoryCache::new(Some(2), None);
        cache.set("a", json!(1), None).await.unwrap();
        cache.set("b", json!(2), None).await.unwrap();
        cache.set("c", json!(3), None).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("c").await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn increment_counts_from_zero() {
        let cache = InMemoryCache::default();
        assert_eq!(cache.increment("calls:s1", 1, None).await.unwrap(), 1);
        assert_eq!(cache.increment("calls:s1", 2, None).await.unwrap(), 3);

        cache.set("text", json!("x"), None).await.unwrap();
        assert!(cache.increment("text", 1, None).await.is_err());
    }
}
