//! Per-request search pipeline.

use crate::config::SearchConfig;
use crate::index::{build_query, ArticleIndex, ArticleResult, IndexMaterializer, SearchLimit};
use crate::storage::open_store;
use crate::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Successful search payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ArticleResult>,
    pub count: usize,
    /// The FTS5 expression that was executed.
    pub query: String,
}

/// Search entry point shared by all request handlers.
///
/// Owns the materializer and with it the only cross-request state.
pub struct SearchService {
    materializer: IndexMaterializer,
}

impl SearchService {
    pub fn new(materializer: IndexMaterializer) -> Self {
        Self { materializer }
    }

    /// Build a service from runtime configuration.
    ///
    /// An unusable store endpoint is reported as a configuration error.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let store = open_store(&config.store_endpoint)
            .map_err(|e| SearchError::configuration(e.to_string()))?;
        Ok(Self::new(IndexMaterializer::from_config(config, store)))
    }

    pub fn materializer(&self) -> &IndexMaterializer {
        &self.materializer
    }

    /// Run one search request.
    ///
    /// Input is validated before the index is touched, so an empty request
    /// never triggers a fetch.
    pub async fn search(
        &self,
        free_text: &str,
        tag: Option<&str>,
        limit: SearchLimit,
    ) -> Result<SearchResponse> {
        let expression = build_query(free_text, tag)?;
        debug!("Composed query: {}", expression);

        let db_path = self.materializer.ensure_local_index().await?;
        let index = ArticleIndex::new(db_path);

        let query = expression.to_fts5();
        let results = tokio::task::spawn_blocking(move || index.search(&expression, limit))
            .await
            .map_err(|e| SearchError::Query {
                message: format!("Search task failed: {}", e),
                source: None,
            })??;

        Ok(SearchResponse {
            count: results.len(),
            results,
            query,
        })
    }

    /// Materialize the index ahead of the first request.
    ///
    /// Returns the local path and logs the article count.
    pub async fn prefetch(&self) -> Result<PathBuf> {
        let db_path = self.materializer.ensure_local_index().await?;
        let index = ArticleIndex::new(db_path.clone());
        let count = tokio::task::spawn_blocking(move || index.article_count())
            .await
            .map_err(|e| SearchError::Query {
                message: format!("Article count task failed: {}", e),
                source: None,
            })??;
        info!("Index ready at {} with {} articles", db_path.display(), count);
        Ok(db_path)
    }
}
