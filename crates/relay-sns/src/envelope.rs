use serde::{Deserialize, Serialize};

/// Value of the `x-amz-sns-message-type` header and the envelope `Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
  Notification,
  SubscriptionConfirmation,
  UnsubscribeConfirmation,
}

impl MessageType {
  pub const HEADER: &'static str = "x-amz-sns-message-type";

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "Notification" => Some(Self::Notification),
      "SubscriptionConfirmation" => Some(Self::SubscriptionConfirmation),
      "UnsubscribeConfirmation" => Some(Self::UnsubscribeConfirmation),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Notification => "Notification",
      Self::SubscriptionConfirmation => "SubscriptionConfirmation",
      Self::UnsubscribeConfirmation => "UnsubscribeConfirmation",
    }
  }
}

/// A notification envelope as delivered in the HTTP request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
  #[serde(rename = "Type")]
  pub message_type:      String,
  pub message_id:        String,
  pub topic_arn:         String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject:           Option<String>,
  pub message:           String,
  pub timestamp:         String,
  pub signature_version: String,
  /// Base64.
  pub signature:         String,
  #[serde(rename = "SigningCertURL")]
  pub signing_cert_url:  String,
  #[serde(rename = "SubscribeURL", default, skip_serializing_if = "Option::is_none")]
  pub subscribe_url:     Option<String>,
  #[serde(rename = "UnsubscribeURL", default, skip_serializing_if = "Option::is_none")]
  pub unsubscribe_url:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token:             Option<String>,
}

impl Envelope {
  pub fn from_json(body: &[u8]) -> serde_json::Result<Self> { serde_json::from_slice(body) }

  pub fn kind(&self) -> Option<MessageType> { MessageType::parse(&self.message_type) }
}
