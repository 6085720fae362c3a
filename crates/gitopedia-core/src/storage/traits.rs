//! Blob store trait and shared types.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by blob store implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {location}")]
    NotFound { location: String },

    #[error("Blob store returned status {status} for {location}")]
    Status { location: String, status: u16 },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid blob store endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

/// Result type alias for blob store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Create an IO error with path context.
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }
}

/// Address of a blob: a bucket (container) and a key inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

impl BlobLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Key split on `/`, with empty segments dropped.
    pub fn key_segments(&self) -> impl Iterator<Item = &str> {
        self.key.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Read access to a blob store.
///
/// Implementations write the blob's full contents to `destination`, creating
/// or truncating it. They do not retry and do not clean up a partially
/// written destination; callers own temp-file discipline.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy the blob at `location` into `destination`.
    ///
    /// Returns the number of bytes written.
    async fn fetch_to(&self, location: &BlobLocation, destination: &Path) -> StorageResult<u64>;
}
