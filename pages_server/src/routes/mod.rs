//! HTTP routes: webhook receiver and health check.

pub mod webhook;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use pages_builder::CommandRunner;
use tower_http::trace::TraceLayer;

use crate::config::PagesConfig;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PagesConfig>,
    pub runner: Arc<dyn CommandRunner>,
}

/// Build the server's Axum router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Webhook ──

async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    crate::metrics::webhook_received(webhook::event_type(&headers));

    webhook::handle_webhook(&state, &headers, body)
}

// ── Health ──

async fn health() -> &'static str {
    "ok"
}
