//! Handler for `POST /v1/street-manager-relay/sns`.
//!
//! Envelopes are authenticated before anything is acted on. Subscription
//! confirmations are answered by visiting the `SubscribeURL`; notifications
//! carry one registry event which is normalised and upserted.

use axum::{Json, extract::State, http::HeaderMap};
use bytes::Bytes;
use relay_core::{publisher::EventNotifierMessage, store::EventStore};
use relay_sns::{CertificateSource, Envelope, MessageType};
use reqwest::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

#[derive(Debug, Error)]
pub enum ConfirmError {
  #[error("subscription confirmation returned status {0}")]
  Status(u16),
}

pub async fn handler<S, C>(
  State(state): State<AppState<S, C>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<Value>, ApiError>
where
  S: EventStore,
  C: CertificateSource,
{
  let header = headers
    .get(MessageType::HEADER)
    .ok_or_else(|| ApiError::BadRequest(format!("missing {} header", MessageType::HEADER)))?
    .to_str()
    .map_err(|_| ApiError::BadRequest(format!("invalid {} header", MessageType::HEADER)))?;

  let envelope =
    Envelope::from_json(&body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))?;

  let kind = match MessageType::parse(header) {
    Some(MessageType::UnsubscribeConfirmation) => {
      info!(topic_arn = %envelope.topic_arn, "unsubscribe confirmation ignored");
      return Ok(success());
    }
    Some(kind) => kind,
    None => {
      warn!(message_type = header, message_id = %envelope.message_id, "unknown message type ignored");
      return Ok(success());
    }
  };
  if envelope.message_type != kind.as_str() {
    return Err(ApiError::BadRequest(format!(
      "{} header {header:?} does not match envelope type {:?}",
      MessageType::HEADER,
      envelope.message_type
    )));
  }

  authenticate(&state, &envelope).await?;

  match kind {
    MessageType::SubscriptionConfirmation => confirm_subscription(&state, &envelope).await?,
    MessageType::Notification => store_notification(&state, &envelope).await?,
    MessageType::UnsubscribeConfirmation => {}
  }
  Ok(success())
}

fn success() -> Json<Value> { Json(json!({ "status": "success" })) }

async fn authenticate<S, C: CertificateSource>(
  state: &AppState<S, C>,
  envelope: &Envelope,
) -> Result<(), ApiError> {
  match state.verifier.verify(envelope).await {
    Ok(true) => Ok(()),
    Ok(false) => {
      warn!(
        target: "security",
        message_id = %envelope.message_id,
        topic_arn = %envelope.topic_arn,
        "message signature is not valid"
      );
      Err(ApiError::Unauthorized("message signature is not valid".to_owned()))
    }
    Err(e) if e.is_rejection() => {
      warn!(
        target: "security",
        message_id = %envelope.message_id,
        topic_arn = %envelope.topic_arn,
        error = %e,
        "message rejected"
      );
      Err(ApiError::Unauthorized(e.to_string()))
    }
    Err(e) => Err(ApiError::Upstream(Box::new(e))),
  }
}

async fn confirm_subscription<S, C>(
  state: &AppState<S, C>,
  envelope: &Envelope,
) -> Result<(), ApiError> {
  let url = envelope
    .subscribe_url
    .as_deref()
    .ok_or_else(|| ApiError::BadRequest("SubscribeURL is missing".to_owned()))?;

  let response = state
    .http
    .get(url)
    .send()
    .await
    .map_err(|e| ApiError::Upstream(Box::new(e)))?;
  if response.status() != StatusCode::OK {
    return Err(ApiError::Upstream(Box::new(ConfirmError::Status(response.status().as_u16()))));
  }

  info!(topic_arn = %envelope.topic_arn, "subscription confirmed");
  Ok(())
}

async fn store_notification<S: EventStore, C>(
  state: &AppState<S, C>,
  envelope: &Envelope,
) -> Result<(), ApiError> {
  let event = EventNotifierMessage::from_json(envelope.message.as_bytes())
    .and_then(EventNotifierMessage::normalise)
    .map_err(|e| ApiError::Normalise(Box::new(e)))?;
  let object_reference = event.object_reference.clone();

  let mut batch = state.store.batch_upsert();
  if let Err(e) = batch.upsert(event) {
    return Err(ApiError::Normalise(Box::new(batch.abort(e))));
  }
  let ids = batch.done().await.map_err(|e| ApiError::Store(Box::new(e)))?;

  info!(object_reference = %object_reference, id = ?ids.first(), "event stored");
  Ok(())
}
