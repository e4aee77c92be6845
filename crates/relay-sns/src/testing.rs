//! Fixtures for tests: a self-signed RSA certificate with its private key,
//! and helpers that produce correctly signed envelopes.
//!
//! Enabled by the `test-util` feature.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, pkcs8::DecodePrivateKey as _};
use sha1::{Digest as _, Sha1};

use crate::{CertificateSource, Envelope, Result, string_to_sign};

pub const TEST_CERT_PEM: &str = include_str!("../testdata/cert.pem");
pub const TEST_KEY_PEM: &str = include_str!("../testdata/key.pem");
/// A P-256 certificate, for exercising the not-RSA path.
pub const TEST_EC_CERT_PEM: &str = include_str!("../testdata/ec-cert.pem");

pub const TEST_CERT_URL: &str = "https://sns.eu-west-2.amazonaws.com/SimpleNotificationService-test.pem";
pub const TEST_TOPIC_ARN: &str = "arn:aws:sns:eu-west-2:123456789012:street-manager-events";

/// Serves one fixed PEM for every URL.
#[derive(Debug, Clone)]
pub struct StaticCertificate(Arc<str>);

impl StaticCertificate {
  pub fn new(pem: &str) -> Self { Self(Arc::from(pem)) }

  pub fn test_cert() -> Self { Self::new(TEST_CERT_PEM) }
}

impl CertificateSource for StaticCertificate {
  async fn certificate(&self, _url: &str) -> Result<Arc<str>> { Ok(self.0.clone()) }
}

/// Overwrite `envelope.signature` with a signature from the fixture key.
///
/// Panics if the envelope type is not signable.
pub fn sign(envelope: &mut Envelope) {
  let key = RsaPrivateKey::from_pkcs8_pem(TEST_KEY_PEM).expect("fixture key");
  let signed = string_to_sign(envelope).expect("signable envelope");
  let digest = Sha1::digest(signed.as_bytes());
  let signature = key
    .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
    .expect("sign with fixture key");
  envelope.signature = STANDARD.encode(signature);
}

fn unsigned(message_type: &str, message: &str) -> Envelope {
  Envelope {
    message_type:      message_type.to_owned(),
    message_id:        "6b6b1d64-6f0f-5b9e-9a9f-1b4b8c3c2d11".to_owned(),
    topic_arn:         TEST_TOPIC_ARN.to_owned(),
    subject:           None,
    message:           message.to_owned(),
    timestamp:         "2025-05-01T09:00:00.000Z".to_owned(),
    signature_version: "1".to_owned(),
    signature:         String::new(),
    signing_cert_url:  TEST_CERT_URL.to_owned(),
    subscribe_url:     None,
    unsubscribe_url:   None,
    token:             None,
  }
}

/// A `Notification` carrying `message`, signed with the fixture key.
pub fn signed_notification(message: &str) -> Envelope {
  let mut envelope = unsigned("Notification", message);
  sign(&mut envelope);
  envelope
}

/// A `SubscriptionConfirmation` pointing at `subscribe_url`, signed with the
/// fixture key.
pub fn signed_subscription_confirmation(subscribe_url: &str) -> Envelope {
  let mut envelope = unsigned(
    "SubscriptionConfirmation",
    "You have chosen to subscribe to the topic. To confirm the subscription, visit the SubscribeURL included in this message.",
  );
  envelope.subscribe_url = Some(subscribe_url.to_owned());
  envelope.token = Some("2336412f37fb687f5d51e6e2425f004aed".to_owned());
  sign(&mut envelope);
  envelope
}
