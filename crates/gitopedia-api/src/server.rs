//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_preflight, handle_search};
use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use gitopedia_search::SearchService;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Methods advertised to browsers on every response.
const ALLOWED_METHODS: &str = "GET,OPTIONS";
/// Request headers advertised to browsers on every response.
const ALLOWED_HEADERS: &str = "Content-Type";

/// Application state shared across handlers.
pub struct AppState {
    /// Search pipeline, including the materialized-index cache
    pub service: SearchService,
    /// Value of `Access-Control-Allow-Origin`
    pub cors_origin: HeaderValue,
}

impl AppState {
    pub fn new(service: SearchService, cors_origin: HeaderValue) -> Self {
        Self {
            service,
            cors_origin,
        }
    }
}

/// Build the router.
///
/// Search is served at both `/` and `/search`; each also answers `OPTIONS`
/// preflights. CORS headers are set on every response, errors included.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_origin = state.cors_origin.clone();

    Router::new()
        .route("/", get(handle_search).options(handle_preflight))
        .route("/search", get(handle_search).options(handle_preflight))
        .route("/health", get(handle_health))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            cors_origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the bound address (useful when port=0) and the handle of the
/// serving task, which completes once `shutdown` resolves and in-flight
/// requests have drained.
pub async fn start_server<F>(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    shutdown: F,
) -> anyhow::Result<(SocketAddr, JoinHandle<std::io::Result<()>>)>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    });

    Ok((actual_addr, handle))
}
