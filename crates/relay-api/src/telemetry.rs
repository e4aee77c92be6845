//! Request metrics middleware.

use std::time::Instant;

use axum::{
  extract::{MatchedPath, Request},
  middleware::Next,
  response::Response,
};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_requests_duration_seconds";

/// Count and time every routed request, labelled by method, matched route
/// and status.
pub async fn track_metrics(req: Request, next: Next) -> Response {
  let start = Instant::now();
  let path = match req.extensions().get::<MatchedPath>() {
    Some(matched) => matched.as_str().to_owned(),
    None => req.uri().path().to_owned(),
  };
  let method = req.method().to_string();

  let response = next.run(req).await;

  let latency = start.elapsed().as_secs_f64();
  let labels = [
    ("method", method),
    ("path", path),
    ("status", response.status().as_u16().to_string()),
  ];
  metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
  metrics::histogram!(REQUEST_DURATION, &labels).record(latency);

  response
}
