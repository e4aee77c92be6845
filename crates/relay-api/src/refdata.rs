//! `GET /v1/street-manager-relay/refdata`.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  response::{IntoResponse, Response},
};
use relay_core::{query::RefData, store::EventStore};
use serde::Serialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct RefDataResponse<'a> {
  pub refdata:     &'a RefData,
  pub attribution: &'a str,
}

/// Facet value counts, memoised for the configured TTL. Concurrent misses
/// share one store query; failures are not cached.
pub async fn handler<S: EventStore + 'static, C>(
  State(state): State<AppState<S, C>>,
) -> Result<Response, ApiError> {
  let store = state.store.clone();
  let refdata = state
    .ref_data
    .try_get_with((), async move { store.ref_data().await.map(Arc::new) })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let body = RefDataResponse { refdata: &refdata, attribution: &state.attribution };
  Ok(Json(body).into_response())
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;
  use relay_core::{BBox, Event, store::EventStore as _};

  use crate::test_support::*;

  fn event(reference: &str, status: &str) -> Event {
    Event {
      object_reference: reference.into(),
      work_status_ref: Some(status.into()),
      works_location_coordinates: Some("POINT(1 1)".into()),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn empty_store_serialises_empty_counts() {
    let (status, body) = get_json(make_state().await, crate::REFDATA_PATH).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "refdata": {}, "attribution": "test attribution" }));
  }

  #[tokio::test]
  async fn counts_and_memoises() {
    let state = make_state().await;
    let mut batch = state.store.batch_upsert();
    for (reference, status) in [("A", "planned"), ("B", "planned"), ("C", "in_progress")] {
      batch.upsert(event(reference, status)).unwrap();
    }
    batch.done().await.unwrap();

    let (status, body) = get_json(state.clone(), crate::REFDATA_PATH).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attribution"], "test attribution");
    assert_eq!(body["refdata"]["work_status_ref"]["planned"], 2);
    assert_eq!(body["refdata"]["work_status_ref"]["in_progress"], 1);

    // Within the TTL a new row is not reflected.
    let mut batch = state.store.batch_upsert();
    assert_eq!(batch.upsert(event("D", "planned")).unwrap(), BBox::from_corners(1.0, 1.0, 1.0, 1.0));
    batch.done().await.unwrap();

    let (_, body) = get_json(state.clone(), crate::REFDATA_PATH).await;
    assert_eq!(body["refdata"]["work_status_ref"]["planned"], 2);

    state.ref_data.invalidate_all();
    let (_, body) = get_json(state, crate::REFDATA_PATH).await;
    assert_eq!(body["refdata"]["work_status_ref"]["planned"], 3);
  }
}
