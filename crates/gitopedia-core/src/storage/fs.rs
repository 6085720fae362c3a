//! Blob store over a local directory tree.

use super::traits::{BlobLocation, BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Blob store reading `<root>/<bucket>/<key>` from the local filesystem.
///
/// Used for development against a locally built index and in tests.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob at `location` under the store root.
    pub fn blob_path(&self, location: &BlobLocation) -> PathBuf {
        let mut path = self.root.join(&location.bucket);
        path.extend(location.key_segments());
        path
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn fetch_to(&self, location: &BlobLocation, destination: &Path) -> StorageResult<u64> {
        let source = self.blob_path(location);
        match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StorageError::NotFound {
                    location: location.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    location: location.to_string(),
                })
            }
            Err(e) => return Err(StorageError::io("Failed to stat blob", &source, e)),
        }

        tokio::fs::copy(&source, destination)
            .await
            .map_err(|e| StorageError::io("Failed to copy blob", destination, e))
    }
}
