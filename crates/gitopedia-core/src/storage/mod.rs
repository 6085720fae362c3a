//! Blob storage access for the index artifact.
//!
//! The search core only ever needs one operation from storage: copy a named
//! blob to a local path. [`BlobStore`] is that seam; [`HttpBlobStore`] speaks
//! path-style object GETs and [`FsBlobStore`] reads a directory tree laid out
//! as `<root>/<bucket>/<key>`.

mod fs;
mod http;
mod traits;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
pub use traits::{BlobLocation, BlobStore, StorageError, StorageResult};

use std::sync::Arc;
use url::Url;

/// Open the blob store addressed by `endpoint`.
///
/// `file://` endpoints map to [`FsBlobStore`], `http://` and `https://` to
/// [`HttpBlobStore`].
pub fn open_store(endpoint: &str) -> StorageResult<Arc<dyn BlobStore>> {
    let url = Url::parse(endpoint).map_err(|e| StorageError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;

    match url.scheme() {
        "file" => {
            let root = url
                .to_file_path()
                .map_err(|_| StorageError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    message: "file endpoint must be an absolute local path".to_string(),
                })?;
            Ok(Arc::new(FsBlobStore::new(root)))
        }
        "http" | "https" => Ok(Arc::new(HttpBlobStore::new(url)?)),
        other => Err(StorageError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}
