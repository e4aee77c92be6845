//! Error type for `relay-sns`.

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported signature version {0:?}")]
  UnsupportedSignatureVersion(String),

  #[error("message type {0:?} is not signed")]
  UnsupportedMessageType(String),

  #[error("signing certificate URL must use https: {0}")]
  InsecureCertUrl(String),

  #[error("failed to fetch signing certificate: {0}")]
  Fetch(#[from] reqwest::Error),

  #[error("signing certificate fetch from {url} returned {status}")]
  FetchStatus { url: String, status: u16 },

  #[error("malformed signing certificate: {0}")]
  Certificate(String),

  #[error("signing certificate key is not RSA (algorithm {0})")]
  NotRsa(String),

  #[error("signature is not valid base64: {0}")]
  Base64(#[from] base64::DecodeError),

  /// An error produced by a certificate fetch that other callers were
  /// waiting on.
  #[error(transparent)]
  Shared(Arc<Error>),
}

impl Error {
  /// The envelope itself is unacceptable, as opposed to an infrastructure
  /// failure while checking it.
  pub fn is_rejection(&self) -> bool {
    match self {
      Self::UnsupportedSignatureVersion(_)
      | Self::UnsupportedMessageType(_)
      | Self::InsecureCertUrl(_) => true,
      Self::Shared(inner) => inner.is_rejection(),
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
