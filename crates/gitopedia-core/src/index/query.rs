//! FTS5 query building from untrusted request input.
//!
//! A request contributes up to two clauses: free text, passed to FTS5 as
//! written, and an exact tag filter, which is always rendered as a quoted
//! column phrase. Rendering happens once, in [`QueryExpression::to_fts5`].

use crate::config::QueryConfig;
use crate::{Result, SearchError};
use std::fmt;

/// FTS5 column holding the space-joined tags of an article.
const TAGS_COLUMN: &str = "tags";

/// Quote a string as an FTS5 phrase, doubling embedded quotes.
pub fn quote_fts5_phrase(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One clause of a query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Free text in FTS5 query syntax. Operators and quoting written by the
    /// caller reach the engine unchanged.
    FreeText(String),
    /// Exact match on the tags column. Holds the unescaped tag value.
    TagExact(String),
}

impl Clause {
    fn render(&self) -> String {
        match self {
            Clause::FreeText(text) => text.clone(),
            Clause::TagExact(tag) => format!("{}:{}", TAGS_COLUMN, quote_fts5_phrase(tag)),
        }
    }
}

/// Ordered conjunction of clauses: free text first, then the tag filter.
///
/// Only [`build_query`] constructs one, so an expression is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExpression {
    clauses: Vec<Clause>,
}

impl QueryExpression {
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Render the expression as an FTS5 `MATCH` argument.
    pub fn to_fts5(&self) -> String {
        self.clauses
            .iter()
            .map(Clause::render)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fts5())
    }
}

/// Build a query expression from raw request input.
///
/// Both inputs are trimmed. Fails with [`SearchError::EmptyQuery`] when
/// neither yields a clause.
///
/// - `"rocket"`, `Some("science")` → `rocket AND tags:"science"`
/// - `""`, `Some("he said \"hi\"")` → `tags:"he said ""hi"""`
pub fn build_query(free_text: &str, tag: Option<&str>) -> Result<QueryExpression> {
    let mut clauses = Vec::with_capacity(2);

    let free_text = free_text.trim();
    if !free_text.is_empty() {
        clauses.push(Clause::FreeText(free_text.to_string()));
    }

    if let Some(tag) = tag.map(str::trim).filter(|t| !t.is_empty()) {
        clauses.push(Clause::TagExact(tag.to_string()));
    }

    if clauses.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    Ok(QueryExpression { clauses })
}

/// Number of results to return, always within
/// [`QueryConfig::MIN_LIMIT`]..=[`QueryConfig::MAX_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimit(usize);

impl SearchLimit {
    /// Clamp a requested count into range.
    pub fn clamped(requested: i64) -> Self {
        let clamped = requested.clamp(QueryConfig::MIN_LIMIT as i64, QueryConfig::MAX_LIMIT as i64);
        Self(clamped as usize)
    }

    /// Parse a raw `limit` parameter.
    ///
    /// Absent or non-numeric input falls back to the default instead of
    /// failing the request.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => value
                .parse::<i64>()
                .map(Self::clamped)
                .unwrap_or_default(),
            None => Self::default(),
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        Self(QueryConfig::DEFAULT_LIMIT)
    }
}
