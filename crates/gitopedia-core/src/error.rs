//! Error types for the Gitopedia search core.
//!
//! Every failure a search request can hit falls into one of four kinds. The
//! HTTP layer maps each kind to exactly one status code and caller-facing
//! message; the detailed text carried here is for logs only.

use thiserror::Error;

/// Main error type for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The remote location of the index artifact is not configured.
    ///
    /// Fatal for the process: every request fails the same way until the
    /// configuration is fixed.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Materializing the index artifact onto local storage failed.
    #[error("Failed to fetch index artifact {location}: {message}")]
    Fetch {
        location: String,
        message: String,
        #[source]
        source: Option<crate::storage::StorageError>,
    },

    /// Neither free text nor a tag filter survived trimming.
    #[error("Missing query parameter 'q' or 'tag'")]
    EmptyQuery,

    /// The index could not be opened or the expression could not be evaluated.
    #[error("Query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

impl From<rusqlite::Error> for SearchError {
    fn from(err: rusqlite::Error) -> Self {
        SearchError::Query {
            message: "SQLite statement failed".to_string(),
            source: Some(err),
        }
    }
}

impl SearchError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        SearchError::Configuration {
            message: message.into(),
        }
    }

    /// Whether the caller is at fault (HTTP 4xx) rather than the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            SearchError::EmptyQuery => true,
            SearchError::Configuration { .. }
            | SearchError::Fetch { .. }
            | SearchError::Query { .. } => false,
        }
    }

    /// Message that is safe to hand back to an untrusted caller.
    ///
    /// Server-side kinds collapse to one generic string so index layout and
    /// storage locations never leak.
    pub fn public_message(&self) -> &'static str {
        match self {
            SearchError::EmptyQuery => "Missing query parameter 'q' or 'tag'",
            SearchError::Configuration { .. }
            | SearchError::Fetch { .. }
            | SearchError::Query { .. } => "Internal search error",
        }
    }
}
