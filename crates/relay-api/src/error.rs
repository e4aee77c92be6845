//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::QueryRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by an API handler.
///
/// Client errors carry their message to the response. Server errors are
/// logged with their cause and answered with a fixed message.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("upstream request failed: {0}")]
  Upstream(#[source] BoxError),

  #[error("event could not be normalised: {0}")]
  Normalise(#[source] BoxError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::Upstream(_)
      | ApiError::Normalise(_)
      | ApiError::Store(_)
      | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::BadRequest(m) | ApiError::Unauthorized(m) => m.clone(),
      ApiError::Upstream(_) => "upstream request failed".to_owned(),
      ApiError::Normalise(_) => "failed to handle message".to_owned(),
      ApiError::Store(_) => "store error".to_owned(),
      ApiError::Internal(_) => "internal server error".to_owned(),
    };
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
