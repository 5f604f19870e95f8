//! HTTP surface: shared state, routes and the server loop.

pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::GlobalConfig;
use crate::store::MeetingStore;
use crate::worker::MeetingWorker;
use crate::AppError;

/// Shared application state accessible by all request handlers.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Meeting record store.
    pub store: Arc<dyn MeetingStore>,
    /// Background worker.
    pub worker: Arc<dyn MeetingWorker>,
    /// Server-wide shutdown token; every stream session derives from it.
    pub shutdown: CancellationToken,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            Self::Validation(ref msg) | Self::NotFound(ref msg) => msg.clone(),
            ref other => {
                error!(err = %other, "request failed");
                "internal server error".to_owned()
            }
        };

        let body = json!({ "error": { "code": self.code(), "message": message } });
        (status, Json(body)).into_response()
    }
}
