//! Local materialization of the remote index artifact.
//!
//! The artifact is fetched at most once per [`IndexMaterializer`]: the first
//! successful call records the local path and every later call returns it
//! without touching storage. The local file name is fixed, so a scratch
//! directory that outlives the process (a reused serverless sandbox, say)
//! also skips the fetch.
//!
//! Downloads land on `<name>.<pid>.part` and are renamed into place only once
//! complete, so an interrupted fetch never leaves a file that looks finished.
//! Partial files older than [`NetworkConfig::FETCH_TIMEOUT`] belong to a
//! process that died mid-fetch and are removed before the next download.

use crate::config::{IndexConfig, NetworkConfig, SearchConfig};
use crate::storage::{BlobLocation, BlobStore, StorageError};
use crate::{Result, SearchError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Owns the process-wide "index is on local disk" state.
pub struct IndexMaterializer {
    store: Arc<dyn BlobStore>,
    location: Option<BlobLocation>,
    local_path: PathBuf,
    ready: OnceCell<PathBuf>,
}

impl IndexMaterializer {
    /// Create a materializer fetching `location` from `store` into `local_path`.
    ///
    /// A `None` location makes every call fail with a configuration error.
    pub fn new(
        store: Arc<dyn BlobStore>,
        location: Option<BlobLocation>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            location,
            local_path: local_path.into(),
            ready: OnceCell::new(),
        }
    }

    /// Create a materializer from runtime configuration.
    pub fn from_config(config: &SearchConfig, store: Arc<dyn BlobStore>) -> Self {
        let location = config
            .index_bucket
            .as_ref()
            .map(|bucket| BlobLocation::new(bucket.clone(), config.index_key.clone()));
        Self::new(store, location, config.local_index_path())
    }

    /// Deterministic local path the artifact is materialized to.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Whether a local copy has been confirmed in this process.
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Ensure the index exists locally and return its path.
    ///
    /// Concurrent first callers are serialized; exactly one of them performs
    /// the fetch. Failures are not cached, so a later call tries again.
    pub async fn ensure_local_index(&self) -> Result<PathBuf> {
        if let Some(path) = self.ready.get() {
            debug!("Index already materialized at {}", path.display());
            return Ok(path.clone());
        }

        let path = self.ready.get_or_try_init(|| self.materialize()).await?;
        Ok(path.clone())
    }

    async fn materialize(&self) -> Result<PathBuf> {
        let location = self.location.as_ref().ok_or_else(|| {
            SearchError::configuration("INDEX_BUCKET environment variable is not set")
        })?;

        let exists = tokio::fs::try_exists(&self.local_path).await.map_err(|e| {
            fetch_error(
                location,
                StorageError::io("Failed to stat index", &self.local_path, e),
            )
        })?;
        if exists {
            info!("Reusing index already on disk at {}", self.local_path.display());
            return Ok(self.local_path.clone());
        }

        if let Some(parent) = self.local_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                fetch_error(
                    location,
                    StorageError::io("Failed to create directory", parent, e),
                )
            })?;
        }

        self.sweep_stale_parts().await;

        let temp_path = temp_path_for(&self.local_path);
        info!("Fetching index {} to {}", location, self.local_path.display());

        let bytes = match self.store.fetch_to(location, &temp_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(fetch_error(location, e));
            }
        };

        if let Err(e) = tokio::fs::rename(&temp_path, &self.local_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(fetch_error(
                location,
                StorageError::io("Failed to move index into place", &self.local_path, e),
            ));
        }

        info!("Fetched {} bytes of index to {}", bytes, self.local_path.display());
        Ok(self.local_path.clone())
    }

    /// Remove partial downloads left next to the local path by dead processes.
    ///
    /// Failures are logged and otherwise ignored.
    async fn sweep_stale_parts(&self) {
        let Some(file_name) = self.local_path.file_name() else {
            return;
        };
        let dir = match self.local_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let prefix = format!("{}.", file_name.to_string_lossy());

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot scan {} for partial downloads: {}", dir.display(), e);
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Cannot scan {} for partial downloads: {}", dir.display(), e);
                    break;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(IndexConfig::TEMP_SUFFIX) {
                continue;
            }

            let stale = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= NetworkConfig::FETCH_TIMEOUT);
            if !stale {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => info!("Removed stale partial download {}", entry.path().display()),
                Err(e) => warn!(
                    "Failed to remove stale partial download {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
    }
}

fn fetch_error(location: &BlobLocation, err: StorageError) -> SearchError {
    SearchError::Fetch {
        location: location.to_string(),
        message: "storage request failed".to_string(),
        source: Some(err),
    }
}

/// Temp file next to `path`, unique per process.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| IndexConfig::LOCAL_FILE_NAME.to_string());
    path.with_file_name(format!(
        "{}.{}{}",
        file_name,
        std::process::id(),
        IndexConfig::TEMP_SUFFIX
    ))
}
