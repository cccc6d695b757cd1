//! HTTP surface: message intake, health, metrics.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;
use crate::errors::ServerError;
use crate::messages::InboundMessage;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The run dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Handle for rendering `/metrics`.
    pub metrics: PrometheusHandle,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(post_message))
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ThreadBusy(_) | Self::Aborted(_) => StatusCode::CONFLICT,
            Self::ServerBusy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::State(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn post_message(
    State(app): State<AppState>,
    Json(msg): Json<InboundMessage>,
) -> Response {
    match app.dispatcher.handle_message(msg).await {
        Ok(out) => (StatusCode::OK, Json(out)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_health(State(app): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "activeRuns": app.dispatcher.active_run_count(),
        "liveThreads": app.dispatcher.live_thread_count(),
    }))
    .into_response()
}

async fn get_metrics(State(app): State<AppState>) -> String {
    crate::metrics::render(&app.metrics)
}
