//! HTTP surface of the street-works relay.
//!
//! Exposes an axum [`Router`] with the notification ingest endpoint, the
//! bbox search, the ref-data listing and the operational endpoints, backed
//! by any [`EventStore`] and any [`CertificateSource`].

pub mod bulk;
pub mod config;
pub mod error;
pub mod health;
pub mod ingest;
pub mod promoter;
pub mod refdata;
pub mod search;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::ApiError;
pub use promoter::{EnrichedEvent, PromoterDirectory};

use std::{any::Any, sync::Arc, time::Duration};

use axum::{
  Router, middleware,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use moka::future::Cache;
use relay_core::{query::RefData, store::EventStore};
use relay_sns::{CertificateSource, Verifier};
use tower_http::{
  catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
  trace::TraceLayer,
};

pub const SNS_PATH: &str = "/v1/street-manager-relay/sns";
pub const SEARCH_PATH: &str = "/v1/street-manager-relay/search";
pub const REFDATA_PATH: &str = "/v1/street-manager-relay/refdata";

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, C> {
  pub store:       Arc<S>,
  pub verifier:    Arc<Verifier<C>>,
  /// For subscription confirmation.
  pub http:        reqwest::Client,
  /// Memoised ref-data, under the unit key.
  pub ref_data:    Cache<(), Arc<RefData>>,
  pub promoters:   Arc<PromoterDirectory>,
  pub attribution: Arc<str>,
  pub metrics:     PrometheusHandle,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:       self.store.clone(),
      verifier:    self.verifier.clone(),
      http:        self.http.clone(),
      ref_data:    self.ref_data.clone(),
      promoters:   self.promoters.clone(),
      attribution: self.attribution.clone(),
      metrics:     self.metrics.clone(),
    }
  }
}

impl<S, C> AppState<S, C> {
  pub fn new(
    store: S,
    verifier: Verifier<C>,
    http: reqwest::Client,
    promoters: PromoterDirectory,
    config: &ServerConfig,
    metrics: PrometheusHandle,
  ) -> Self {
    Self {
      store: Arc::new(store),
      verifier: Arc::new(verifier),
      http,
      ref_data: ref_data_cache(config.refdata_ttl()),
      promoters: Arc::new(promoters),
      attribution: Arc::from(config.attribution.as_str()),
      metrics,
    }
  }
}

pub fn ref_data_cache(ttl: Duration) -> Cache<(), Arc<RefData>> {
  Cache::builder().max_capacity(1).time_to_live(ttl).build()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the relay's axum [`Router`].
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: EventStore + 'static,
  C: CertificateSource + 'static,
{
  Router::new()
    .route(SNS_PATH,     post(ingest::handler::<S, C>))
    .route(SEARCH_PATH,  get(search::handler::<S, C>))
    .route(REFDATA_PATH, get(refdata::handler::<S, C>))
    .route("/healthz",   get(health::healthz::<S, C>))
    .route("/metrics",   get(health::metrics::<S, C>))
    .route_layer(middleware::from_fn(telemetry::track_metrics))
    .layer(CompressionLayer::new())
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .layer(CatchPanicLayer::custom(panic_response))
    .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
  let detail = panic
    .downcast_ref::<String>()
    .cloned()
    .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_owned()))
    .unwrap_or_else(|| "unknown panic".to_owned());
  ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

// ─── Test support ─────────────────────────────────────────────────────────────
