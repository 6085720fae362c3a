//! HTTP request handlers.

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gitopedia_search::{SearchError, SearchLimit};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Query string accepted by the search endpoint.
///
/// Everything is optional and kept as text; validation happens in the core.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<String>,
}

impl SearchParams {
    /// Collect parameters from decoded query pairs.
    ///
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "tag" => &mut params.tag,
                "limit" => &mut params.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Health check endpoint.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "index_ready": state.service.materializer().is_ready(),
    }))
}

/// CORS preflight. Never touches the index.
pub async fn handle_preflight() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

/// Search endpoint.
pub async fn handle_search(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = SearchParams::from_pairs(pairs);
    debug!("Search request: {:?}", params);

    let limit = SearchLimit::parse(params.limit.as_deref());
    let result = state
        .service
        .search(
            params.q.as_deref().unwrap_or_default(),
            params.tag.as_deref(),
            limit,
        )
        .await;

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Map a search failure onto its status code and caller-safe body.
fn error_response(err: &SearchError) -> Response {
    let status = if err.is_client_error() {
        debug!("Rejected search request: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        error!("Search failed: {}", error_chain(err));
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(json!({
            "results": [],
            "error": err.public_message(),
        })),
    )
        .into_response()
}

/// Render an error with all of its sources for logging.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
