//! SQLite FTS5 article index.
//!
//! This module provides:
//! - Query building from untrusted input
//! - One-time materialization of the remote index artifact
//! - Ranked search with highlighted snippets

mod article_index;
mod materializer;
mod query;
pub mod schema;

pub use article_index::{ArticleIndex, ArticleResult, ArticleTags};
pub use materializer::IndexMaterializer;
pub use query::{build_query, quote_fts5_phrase, Clause, QueryExpression, SearchLimit};
