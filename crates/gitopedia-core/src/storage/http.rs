//! Object store access over plain HTTP(S).
//!
//! Objects are addressed path-style: `<endpoint>/<bucket>/<key>`. This covers
//! public or presigned-policy S3 buckets as well as S3-compatible servers.

use super::traits::{BlobLocation, BlobStore, StorageError, StorageResult};
use crate::config::NetworkConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Blob store backed by HTTP GET requests.
pub struct HttpBlobStore {
    client: Client,
    endpoint: Url,
}

impl HttpBlobStore {
    /// Create a store rooted at `endpoint`.
    pub fn new(endpoint: Url) -> StorageResult<Self> {
        let client = Client::builder()
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .timeout(NetworkConfig::FETCH_TIMEOUT)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| StorageError::Network {
                message: "Failed to create HTTP client".to_string(),
                source: e,
            })?;

        Ok(Self::with_client(client, endpoint))
    }

    /// Create a store with a preconfigured client.
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Full URL of the object at `location`.
    pub fn object_url(&self, location: &BlobLocation) -> StorageResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidEndpoint {
                endpoint: self.endpoint.to_string(),
                message: "endpoint cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push(&location.bucket)
            .extend(location.key_segments());
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch_to(&self, location: &BlobLocation, destination: &Path) -> StorageResult<u64> {
        let url = self.object_url(location)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::Network {
                message: format!("Request for {} failed", location),
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                location: location.to_string(),
            });
        }
        if !status.is_success() {
            return Err(StorageError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| StorageError::io("Failed to create file", destination, e))?;

        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::Network {
                message: format!("Error reading body of {}", location),
                source: e,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::io("Failed to write file", destination, e))?;
            bytes_written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| StorageError::io("Failed to flush file", destination, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::io("Failed to sync file", destination, e))?;

        Ok(bytes_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(endpoint: &str) -> HttpBlobStore {
        HttpBlobStore::new(Url::parse(endpoint).unwrap()).unwrap()
    }

    #[test]
    fn test_object_url_path_style() {
        let store = store("https://s3.amazonaws.com");
        let url = store
            .object_url(&BlobLocation::new("gitopedia-index", "index.sqlite"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://s3.amazonaws.com/gitopedia-index/index.sqlite"
        );
    }

    #[test]
    fn test_object_url_keeps_endpoint_prefix_and_encodes() {
        let store = store("http://minio.local:9000/storage/");
        let url = store
            .object_url(&BlobLocation::new("kb", "builds/2024 06/index.sqlite"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://minio.local:9000/storage/kb/builds/2024%2006/index.sqlite"
        );
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/kb/index.sqlite")
            .with_status(200)
            .with_body("SQLite format 3\0")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("index.sqlite");
        let bytes = store(&server.url())
            .fetch_to(&BlobLocation::new("kb", "index.sqlite"), &dest)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 16);
        assert_eq!(std::fs::read(&dest).unwrap(), b"SQLite format 3\0");
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/kb/missing.sqlite")
            .with_status(404)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let err = store(&server.url())
            .fetch_to(
                &BlobLocation::new("kb", "missing.sqlite"),
                &temp.path().join("out"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_forbidden() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/kb/index.sqlite")
            .with_status(403)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let err = store(&server.url())
            .fetch_to(
                &BlobLocation::new("kb", "index.sqlite"),
                &temp.path().join("out"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Status { status: 403, .. }));
    }
}
