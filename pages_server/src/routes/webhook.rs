//! GitHub webhook handler: turns pushes to publishing branches into builds.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use pages_builder::{launch_builder, BuildRequest, BuilderOptions, CommandRunner};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::AppState;

/// The `X-GitHub-Event` header; deliveries without one are treated as pushes.
pub fn event_type(headers: &HeaderMap) -> &str {
    headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("push")
}

/// Handle an incoming GitHub webhook payload.
///
/// A push to a configured branch starts a build in the background and
/// answers `202 Accepted` without waiting for it.
pub fn handle_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    match event_type(headers) {
        "push" => {}
        "ping" => {
            tracing::info!("Received GitHub ping webhook");
            return Ok(StatusCode::OK);
        }
        other => {
            tracing::debug!("Ignoring webhook event: {}", other);
            return Ok(StatusCode::OK);
        }
    }

    let request = BuildRequest::from_payload(&body).map_err(|e| {
        tracing::warn!("Malformed push payload: {e}");
        StatusCode::BAD_REQUEST
    })?;

    let Some(opts) = state.config.options_for(&request) else {
        tracing::debug!(
            repo = %request.repo_name,
            branch = %request.branch,
            "No builder profile for branch"
        );
        return Ok(StatusCode::OK);
    };

    spawn_build(state.runner.clone(), request, opts);
    Ok(StatusCode::ACCEPTED)
}

/// Run one build on its own task, tagged with a fresh build id.
pub fn spawn_build(
    runner: Arc<dyn CommandRunner>,
    request: BuildRequest,
    opts: BuilderOptions,
) -> JoinHandle<()> {
    let build_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "build",
        %build_id,
        repo = %request.repo_name,
        branch = %request.branch
    );

    tracing::info!(
        %build_id,
        repo = %request.repo_name,
        branch = %request.branch,
        commit = %request.commit.id,
        "Build queued from push webhook"
    );

    tokio::spawn(
        async move {
            let start = Instant::now();
            let result = launch_builder(&request, opts, runner).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            crate::metrics::build_duration(duration_ms);
            match result {
                Ok(()) => {
                    crate::metrics::build_finished("success");
                    tracing::info!(duration_ms, "Build finished");
                }
                Err(e) => {
                    crate::metrics::build_finished("failure");
                    tracing::warn!(duration_ms, "Build failed: {e}");
                }
            }
        }
        .instrument(span),
    )
}
