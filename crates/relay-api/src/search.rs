//! Handler for `GET /v1/street-manager-relay/search`.
//!
//! `bbox` is required. Facet parameters may be repeated, comma-separated or
//! both. `max_days_ahead` and `max_days_behind` default to 7 and 0.

use std::str::FromStr as _;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use relay_core::{
  BBox,
  query::{Facet, SearchQuery, TemporalFilters},
  store::EventStore,
};
use serde::Serialize;

use crate::{AppState, EnrichedEvent, error::ApiError};

#[derive(Debug, Serialize)]
pub struct SearchResponse {
  pub results:     Vec<EnrichedEvent>,
  pub attribution: String,
}

/// Build a [`SearchQuery`] from raw query pairs. Unknown parameters are
/// ignored.
pub fn parse_query(params: &[(String, String)]) -> Result<SearchQuery, ApiError> {
  let bad_request = |e: relay_core::Error| ApiError::BadRequest(e.to_string());

  let bbox = params
    .iter()
    .find(|(k, _)| k == "bbox")
    .ok_or_else(|| ApiError::BadRequest("bbox is required".to_owned()))?;
  let mut query = SearchQuery::new(BBox::from_csv(&bbox.1).map_err(bad_request)?);

  for (key, value) in params {
    match key.as_str() {
      "max_days_ahead" => {
        query.temporal.max_days_ahead = TemporalFilters::parse_days(key, value).map_err(bad_request)?;
      }
      "max_days_behind" => {
        query.temporal.max_days_behind = TemporalFilters::parse_days(key, value).map_err(bad_request)?;
      }
      other => {
        if let Ok(facet) = Facet::from_str(other) {
          query.facets.extend_csv(facet, value);
        }
      }
    }
  }
  Ok(query)
}

pub async fn handler<S: EventStore, C>(
  State(state): State<AppState<S, C>>,
  params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
  let Query(params) = params?;
  let query = parse_query(&params)?;
  let events = state
    .store
    .search(&query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(SearchResponse {
    results:     events.into_iter().map(|e| state.promoters.enrich(e)).collect(),
    attribution: state.attribution.to_string(),
  }))
}
