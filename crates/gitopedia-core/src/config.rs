//! Centralized configuration for the search core.
//!
//! Fixed parameters live as constants on unit structs; the values that vary
//! per deployment are carried by [`SearchConfig`].

use std::path::PathBuf;
use std::time::Duration;

/// Index artifact naming and local materialization.
pub struct IndexConfig;

impl IndexConfig {
    pub const DEFAULT_INDEX_KEY: &'static str = "index.sqlite";
    /// Fixed so warm processes sharing a scratch directory reuse the file.
    pub const LOCAL_FILE_NAME: &'static str = "gitopedia-index.sqlite";
    pub const TEMP_SUFFIX: &'static str = ".part";
    pub const DEFAULT_STORE_ENDPOINT: &'static str = "https://s3.amazonaws.com";
}

/// Query shaping parameters.
pub struct QueryConfig;

impl QueryConfig {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MIN_LIMIT: usize = 1;
    pub const MAX_LIMIT: usize = 50;
    /// Token window handed to FTS5 `snippet()`.
    pub const SNIPPET_TOKENS: i32 = 15;
    pub const HIGHLIGHT_OPEN: &'static str = "<b>";
    pub const HIGHLIGHT_CLOSE: &'static str = "</b>";
    pub const ELLIPSIS: &'static str = " ... ";
}

/// Network-related configuration for blob fetches.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Whole-transfer budget; index artifacts are tens of megabytes.
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(300);
    pub const USER_AGENT: &'static str = "Gitopedia-Search/1.0";
}

/// Runtime configuration for a search process.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Bucket (or equivalent container) holding the index artifact.
    pub index_bucket: Option<String>,
    /// Key of the index artifact inside the bucket.
    pub index_key: String,
    /// Base URL of the blob store (`https://`, `http://` or `file://`).
    pub store_endpoint: String,
    /// Directory the artifact is materialized into.
    pub scratch_dir: PathBuf,
}

impl SearchConfig {
    /// Deterministic local path of the materialized index.
    pub fn local_index_path(&self) -> PathBuf {
        self.scratch_dir.join(IndexConfig::LOCAL_FILE_NAME)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_bucket: None,
            index_key: IndexConfig::DEFAULT_INDEX_KEY.to_string(),
            store_endpoint: IndexConfig::DEFAULT_STORE_ENDPOINT.to_string(),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// Builder for [`SearchConfig`].
#[derive(Debug, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket. Blank values are treated as unset.
    pub fn index_bucket(mut self, bucket: Option<String>) -> Self {
        self.config.index_bucket = bucket.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn index_key(mut self, key: impl Into<String>) -> Self {
        self.config.index_key = key.into();
        self
    }

    pub fn store_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.store_endpoint = endpoint.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert!(config.index_bucket.is_none());
        assert_eq!(config.index_key, "index.sqlite");
        assert!(config
            .local_index_path()
            .ends_with(IndexConfig::LOCAL_FILE_NAME));
    }

    #[test]
    fn test_blank_bucket_is_unset() {
        let config = SearchConfigBuilder::new()
            .index_bucket(Some("   ".to_string()))
            .build();
        assert!(config.index_bucket.is_none());
    }

    #[test]
    fn test_limits_are_ordered() {
        assert!(QueryConfig::MIN_LIMIT <= QueryConfig::DEFAULT_LIMIT);
        assert!(QueryConfig::DEFAULT_LIMIT <= QueryConfig::MAX_LIMIT);
    }
}
