//! HTTP server for the meeting streaming API.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::routes;
use super::AppState;
use crate::{AppError, Result};

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/meetings/stream", post(routes::start_meeting_stream))
        .route("/meetings/{id}", get(routes::get_meeting))
        .with_state(state)
}

/// Bind `http_host:http_port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the server fails to bind, or `AppError::Io`
/// if serving fails.
pub async fn serve_http(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let host = state.config.http_host.clone();
    let port = state.config.http_port;
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {host}:{port}: {err}")))?;
    serve_listener(listener, state, ct).await
}

/// Serve on an already-bound listener until `ct` is cancelled.
///
/// Cancelling `ct` also closes every open stream session, so in-flight
/// streams end and the graceful shutdown can complete.
///
/// # Errors
///
/// Returns `AppError::Io` if serving fails.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let bind = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("listener has no local address: {err}")))?;
    info!(%bind, "starting HTTP streaming API");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("HTTP server error: {err}")))?;

    info!("HTTP streaming API shut down");
    Ok(())
}
