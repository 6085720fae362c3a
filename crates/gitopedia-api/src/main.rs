//! Gitopedia Search API - HTTP endpoint for the website's article search.
//!
//! This binary wraps the gitopedia-search library in a small Axum server.
//! Configuration comes from flags or the matching environment variables.

mod handler;
mod server;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use gitopedia_search::{IndexConfig, SearchConfigBuilder, SearchService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gitopedia-search")]
#[command(about = "Full-text search endpoint for Gitopedia")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, env = "SEARCH_PORT", default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "SEARCH_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bucket holding the index artifact
    #[arg(long, env = "INDEX_BUCKET")]
    index_bucket: Option<String>,

    /// Key of the index artifact inside the bucket
    #[arg(long, env = "INDEX_KEY", default_value = IndexConfig::DEFAULT_INDEX_KEY)]
    index_key: String,

    /// Blob store base URL (https://, http:// or file://); fetches are unsigned
    ///
    /// The index is read with an unsigned path-style GET of
    /// `{endpoint}/{bucket}/{key}`. A private S3 bucket needing IAM
    /// credentials will answer 403; point this at a public bucket, a
    /// presigned-URL proxy or a file:// directory instead.
    #[arg(long, env = "INDEX_STORE_ENDPOINT", default_value = IndexConfig::DEFAULT_STORE_ENDPOINT)]
    store_endpoint: String,

    /// Directory the index is copied into (defaults to the OS temp dir)
    #[arg(long, env = "INDEX_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Allowed CORS origin
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    cors_origin: String,

    /// Fetch the index during startup instead of on the first search
    #[arg(long, env = "INDEX_PREFETCH")]
    prefetch: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG wins over --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    info!("Starting Gitopedia Search");

    let mut builder = SearchConfigBuilder::new()
        .index_bucket(args.index_bucket)
        .index_key(args.index_key)
        .store_endpoint(args.store_endpoint);
    if let Some(dir) = args.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    let config = builder.build();

    match &config.index_bucket {
        Some(bucket) => info!("Index artifact: {}/{}", bucket, config.index_key),
        None => warn!("INDEX_BUCKET is not set; searches will fail until it is configured"),
    }

    let service = SearchService::from_config(&config)?;

    if args.prefetch {
        if let Err(e) = service.prefetch().await {
            error!("Index prefetch failed, will retry on first search: {}", e);
        }
    }

    let cors_origin = HeaderValue::from_str(&args.cors_origin)
        .with_context(|| format!("Invalid CORS origin '{}'", args.cors_origin))?;
    let state = Arc::new(server::AppState::new(service, cors_origin));

    let (addr, server) =
        server::start_server(state, &args.host, args.port, shutdown_signal()).await?;
    info!("Search server running on {}", addr);

    server.await??;
    info!("Server stopped");

    Ok(())
}

/// Resolve on Ctrl-C. Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining requests"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
