//! HTTP server: file export plus a small status API
//!
//! The output directory is served as static files at the root, so a retrieval link
//! `<host>/<name>` resolves to `<output_dir>/<name>`. Job status lives under `/api/v1`.

use crate::{Config, Orchestrator, Result};
use axum::{Router, http::HeaderValue, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router
///
/// # Routes
///
/// - `GET /` - Liveness text ("Bot started")
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/jobs` - Active jobs
/// - `GET /api/v1/jobs/:chat/:message` - One active job
/// - `GET /api/v1/events` - Server-sent events stream
/// - anything else - static file from the output directory
pub fn create_router(orchestrator: Arc<Orchestrator>, config: Arc<Config>) -> Router {
    let state = AppState::new(orchestrator, config.clone());

    let api = Router::new()
        .route("/health", get(routes::health_check))
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/:chat/:message", get(routes::get_job))
        .route("/events", get(routes::event_stream));

    let router = Router::new()
        .route("/", get(routes::root))
        .nest("/api/v1", api)
        .fallback_service(ServeDir::new(config.output_dir()))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.server.cors_enabled {
        router.layer(build_cors_layer(&config.server.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Serve the router on the configured bind address until `shutdown` fires.
pub async fn start_api_server(
    orchestrator: Arc<Orchestrator>,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.server.bind_address;
    tracing::info!(address = %bind_address, "Starting HTTP server");

    let app = create_router(orchestrator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
