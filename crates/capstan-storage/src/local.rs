//! Blob store on a local directory.
//!
//! Layout under the store path:
//!
//! ```text
//! <store_path>/blobs/<key>        raw bytes
//! <store_path>/meta/<key>.json    { "contentType": ... }
//! ```
//!
//! Writes go to a temporary file first and are renamed into place.

use async_trait::async_trait;
use capstan_core::{BlobInfo, BlobStore, Logger, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::memory::check_key;

const BACKEND: &str = "local";

/// Storage key rules plus: every path component must be a plain name.
fn check_local_key(key: &str) -> StorageResult<()> {
    check_key(key)?;
    if Path::new(key)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Ok(())
    } else {
        Err(StorageError::operation_failed(
            BACKEND,
            "resolve",
            key,
            "key must be a relative path of plain names",
        ))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

pub struct LocalBlobStore {
    root: PathBuf,
    logger: Arc<dyn Logger>,
}

impl LocalBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("blobs")).await?;
        fs::create_dir_all(root.join("meta")).await?;
        logger.debug(&format!("Opened local blob store at {}", root.display()));
        Ok(Self { root, logger })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join("blobs").join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join("meta").join(format!("{key}.json"))
    }

    async fn read_meta(&self, key: &str) -> StorageResult<BlobMeta> {
        match fs::read(self.meta_path(key)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BlobMeta::default()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{name}.tmp"));
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<BlobInfo> {
        check_local_key(key)?;
        let meta = BlobMeta {
            content_type: content_type.map(str::to_string),
        };
        write_atomic(&self.blob_path(key), &data).await?;
        write_atomic(&self.meta_path(key), &serde_json::to_vec(&meta)?).await?;
        tracing::debug!(key, size = data.len(), "Stored blob");

        Ok(BlobInfo {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: meta.content_type,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_local_key(key)?;
        match fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                self.logger.warn(&format!("Failed to read blob '{key}': {e}"));
                Err(e.into())
            }
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        check_local_key(key)?;
        let existed = remove_if_present(&self.blob_path(key)).await?;
        remove_if_present(&self.meta_path(key)).await?;
        Ok(existed)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<BlobInfo>> {
        let blobs = self.root.join("blobs");
        let mut pending = vec![blobs.clone()];
        let mut infos = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&blobs) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(prefix) || key.ends_with(".tmp") {
                    continue;
                }
                let size = entry.metadata().await?.len();
                let meta = self.read_meta(&key).await?;
                infos.push(BlobInfo {
                    key,
                    size,
                    content_type: meta.content_type,
                });
            }
        }

        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_local_key(key)?;
        Ok(fs::try_exists(self.blob_path(key)).await?)
    }
}
