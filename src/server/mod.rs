//! HTTP server for the page widget.
//!
//! - GET /          - Service info
//! - GET /health    - Health check
//! - POST /api/chat - Relay one visitor turn

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::chat::ChatRelay;
use crate::config::RelayConfig;
use crate::inference::CompletionProvider;

pub mod handlers;

/// Response header naming how a chat turn ended.
pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-chat-outcome");

// ============================================================================
// Server State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub relay: ChatRelay,
}

// ============================================================================
// Routes
// ============================================================================

/// Create the router with all endpoints.
pub fn create_router(relay: ChatRelay) -> Router {
    let cors = create_cors_layer(relay.config());
    let body_limit = relay.config().body_limit();

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/chat",
            post(handlers::chat_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { relay })
}

/// Cross-origin policy: any origin when `*` is configured, otherwise the listed hosts.
fn create_cors_layer(config: &RelayConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([OUTCOME_HEADER]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(origins)
}

/// Run the HTTP server until `cancel` fires.
pub async fn run(
    config: Arc<RelayConfig>,
    provider: Arc<dyn CompletionProvider>,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = config.bind_addr();
    let app = create_router(ChatRelay::new(config, provider));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}
