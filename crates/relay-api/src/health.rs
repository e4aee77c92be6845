//! Liveness and metrics endpoints.

use axum::{
  Json,
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use relay_core::store::EventStore;
use serde_json::json;
use tracing::error;

use crate::AppState;

/// `GET /healthz`: 200 when the store answers a ping, 503 otherwise.
pub async fn healthz<S: EventStore, C>(State(state): State<AppState<S, C>>) -> impl IntoResponse {
  match state.store.ping().await {
    Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
    Err(e) => {
      error!(error = %e, "store ping failed");
      (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
    }
  }
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics<S, C>(State(state): State<AppState<S, C>>) -> impl IntoResponse {
  (
    [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
    state.metrics.render(),
  )
}
