// ABOUTME: Binary storage for uploaded media behind a small async trait
// ABOUTME: The local implementation writes under an uploads directory that is also served at /uploads

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

/// Where a blob ended up after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
}

/// A blob found while listing the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub key: String,
    pub url: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `data` under `key`. The blob is readable as soon as this returns.
    async fn put(&self, key: &str, data: &[u8]) -> Result<StoredBlob>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes the blob. A key that is already gone is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Every blob in the store, sorted by key.
    async fn list(&self) -> Result<Vec<BlobEntry>>;
}

pub struct LocalBlobStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            url_prefix: "/uploads".to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(AppError::Storage(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<StoredBlob> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        tracing::debug!(key, bytes = data.len(), "Wrote blob");
        Ok(StoredBlob {
            key: key.to_string(),
            url: self.url_for(key),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Blob {} is missing", key)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(key, "Blob already absent on delete");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobEntry>> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Err(AppError::NotFound(format!(
                "Uploads directory {}",
                self.root.display()
            )));
        }

        let mut entries = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, prefix)) = pending.pop() {
            let mut read_dir = tokio::fs::read_dir(&dir).await?;
            while let Some(item) = read_dir.next_entry().await? {
                let Some(name) = item.file_name().to_str().map(str::to_string) else {
                    tracing::warn!(path = %item.path().display(), "Skipping non UTF-8 path");
                    continue;
                };
                let key = if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                };
                let metadata = item.metadata().await?;
                if metadata.is_dir() {
                    pending.push((item.path(), key));
                } else if metadata.is_file() {
                    entries.push(BlobEntry {
                        url: self.url_for(&key),
                        key,
                        size: metadata.len(),
                    });
                }
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
