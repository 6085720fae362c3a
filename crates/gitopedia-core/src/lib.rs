//! Gitopedia Search - query engine behind the website's article search.
//!
//! This crate answers full-text queries against a prebuilt, read-only SQLite
//! FTS5 index. The index artifact lives in blob storage and is copied to
//! local disk once per process. It has no HTTP layer of its own; see the
//! `gitopedia-search-api` crate for the endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use gitopedia_search::{SearchConfigBuilder, SearchLimit, SearchService};
//!
//! #[tokio::main]
//! async fn main() -> gitopedia_search::Result<()> {
//!     let config = SearchConfigBuilder::new()
//!         .index_bucket(Some("gitopedia-index".to_string()))
//!         .build();
//!     let service = SearchService::from_config(&config)?;
//!
//!     let response = service
//!         .search("rocket", Some("science"), SearchLimit::default())
//!         .await?;
//!     println!("{} results for {}", response.count, response.query);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod service;
pub mod storage;

pub use config::{IndexConfig, NetworkConfig, QueryConfig, SearchConfig, SearchConfigBuilder};
pub use error::{Result, SearchError};
pub use index::{
    build_query, ArticleIndex, ArticleResult, ArticleTags, IndexMaterializer, QueryExpression,
    SearchLimit,
};
pub use service::{SearchResponse, SearchService};
pub use storage::{open_store, BlobLocation, BlobStore, FsBlobStore, HttpBlobStore, StorageError};
