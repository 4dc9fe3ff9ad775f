//! HTTP server and request flow
//!
//! One operation: `POST /search` runs cache lookup → provider search → LLM
//! filter → cache write-back. `GET /health` reports liveness. The cache is
//! an explicitly constructed store living in [`AppState`] for the process
//! lifetime, shared by reference with every handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, trace::TraceLayer,
};
use tracing::{error, info};

use crate::cache::ResultCache;
use crate::config::Config;
use crate::filter::ResultFilter;
use crate::models::{SearchRequest, SearchResults};
use crate::search::SearchProvider;
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Filtered-result cache, one store per process.
    pub cache: ResultCache,
    /// Whether caching is enabled at all (config-level switch; requests can
    /// additionally opt out per call with `use_cache: false`).
    pub cache_enabled: bool,
    /// Shopping search collaborator.
    pub search: Arc<dyn SearchProvider>,
    /// LLM relevance filter collaborator.
    pub filter: Arc<dyn ResultFilter>,
}

impl AppState {
    /// Build state from configuration and the two provider collaborators.
    pub fn new(
        config: &Config,
        search: Arc<dyn SearchProvider>,
        filter: Arc<dyn ResultFilter>,
    ) -> Self {
        Self {
            cache: ResultCache::new(config.cache.ttl, config.cache.max_entries),
            cache_enabled: config.cache.enabled,
            search,
            filter,
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", post(search_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health handler
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// POST /search handler
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    match execute_search(&state, &request).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => {
            error!(query = %request.query, country = %request.country, error = %e, "search failed");
            (e.status_code(), Json(json!({ "error": e.public_detail() }))).into_response()
        }
    }
}

/// The full search flow, separated from the HTTP layer for testability.
///
/// Validates the request, consults the cache, and on a miss calls the search
/// provider and the LLM filter before writing the filtered list back.
pub async fn execute_search(state: &AppState, request: &SearchRequest) -> Result<SearchResults> {
    request.validate()?;

    info!(query = %request.query, country = %request.country, "searching");

    if state.cache_enabled && request.use_cache {
        if let Some(cached) = state.cache.get(&request.query, &request.country) {
            info!(query = %request.query, country = %request.country, "serving cached filtered results");
            return Ok(cached);
        }
    }

    let raw = state.search.search(&request.query, &request.country).await?;
    if raw.is_empty() {
        return Err(Error::NoResults);
    }

    let filtered = state.filter.filter(&raw, &request.query).await?;

    if state.cache_enabled {
        state.cache.set(&request.query, &request.country, filtered.clone());
    }

    Ok(filtered)
}

/// Run the server until a shutdown signal arrives.
pub async fn run(config: &Config, state: Arc<AppState>) -> Result<()> {
    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
        config.server.port,
    );

    let app = create_router(state, config.server.max_body_size);
    let listener = TcpListener::bind(addr).await?;

    info!(host = %config.server.host, port = config.server.port, "Listening");
    info!(
        cache_enabled = config.cache.enabled,
        cache_ttl = ?config.cache.ttl,
        cache_max_entries = config.cache.max_entries,
        "Result cache configured"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
