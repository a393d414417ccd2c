//! Blob store
//!
//! Binary objects addressed by slash-separated paths, uploaded with progress
//! reporting and retrievable through a download URL.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::error::{ErrorKind, StoreError, StoreResult};

/// Default write chunk for progress reporting (256 KB)
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Progress of one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Fraction in `0.0..=1.0`; an empty upload counts as complete
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_transferred as f64 / self.total_bytes as f64
        }
    }

    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// Receiver side is owned by whoever displays progress
pub type ProgressSender = mpsc::UnboundedSender<UploadProgress>;

/// Handle to a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobRef {
    pub path: String,
    pub size: u64,
    pub content_type: String,
}

/// Contract of the hosted object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `path`, reporting progress if a sender is given
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> StoreResult<BlobRef>;

    /// Durable retrieval URL for a stored blob
    async fn download_url(&self, blob: &BlobRef) -> StoreResult<String>;

    /// Read a blob back by path
    async fn fetch(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Remove the blob a download URL points at
    async fn delete_by_url(&self, url: &str) -> StoreResult<()>;
}

/// Blob store backed by a local directory
///
/// Download URLs have the form `{public_base_url}/files/{path}` with each
/// path segment percent-encoded; the API serves them from the same root.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    chunk_size: usize,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Builder method: set the write chunk size
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(path);
        let well_formed = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(StoreError::new(
                ErrorKind::PermissionDenied,
                format!("invalid blob path '{}'", path),
            ));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/files/{}", self.public_base_url, encoded.join("/"))
    }

    /// Map a download URL back to a blob path
    pub fn path_from_url(&self, url: &str) -> StoreResult<String> {
        let prefix = format!("{}/files/", self.public_base_url);
        let encoded = url.strip_prefix(&prefix).ok_or_else(|| {
            StoreError::not_found(format!("'{}' does not belong to this store", url))
        })?;

        let mut segments = Vec::new();
        for segment in encoded.split('/') {
            let decoded = urlencoding::decode(segment)
                .map_err(|e| StoreError::internal(format!("malformed url '{}': {}", url, e)))?;
            segments.push(decoded.into_owned());
        }
        Ok(segments.join("/"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> StoreResult<BlobRef> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let total_bytes = data.len() as u64;
        let report = |bytes_transferred: u64| {
            if let Some(tx) = &progress {
                let _ = tx.send(UploadProgress {
                    bytes_transferred,
                    total_bytes,
                });
            }
        };

        // Staged beside the target; a failed upload never leaves a partial blob.
        let mut staged_name = target.file_name().unwrap_or_default().to_os_string();
        staged_name.push(".part");
        let partial = target.with_file_name(staged_name);
        let mut file = tokio::fs::File::create(&partial).await?;
        report(0);

        let mut written = 0u64;
        for chunk in data.chunks(self.chunk_size) {
            if let Err(e) = file.write_all(chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e.into());
            }
            written += chunk.len() as u64;
            report(written);
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&partial, &target).await?;

        tracing::debug!(path = %path, bytes = total_bytes, "Blob stored");

        Ok(BlobRef {
            path: path.to_string(),
            size: total_bytes,
            content_type: content_type.to_string(),
        })
    }

    async fn download_url(&self, blob: &BlobRef) -> StoreResult<String> {
        let target = self.resolve(&blob.path)?;
        if !tokio::fs::try_exists(&target).await? {
            return Err(StoreError::not_found(format!("blob {} does not exist", blob.path)));
        }
        Ok(self.url_for(&blob.path))
    }

    async fn fetch(&self, path: &str) -> StoreResult<Vec<u8>> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::read(&target).await?)
    }

    async fn delete_by_url(&self, url: &str) -> StoreResult<()> {
        let path = self.path_from_url(url)?;
        let target = self.resolve(&path)?;
        tokio::fs::remove_file(&target).await?;

        tracing::debug!(path = %path, "Blob deleted");
        Ok(())
    }
}
