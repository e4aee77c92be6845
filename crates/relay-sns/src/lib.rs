//! Authentication of pub/sub notification envelopes.
//!
//! An [`Envelope`] is verified by rebuilding its canonical signing string,
//! fetching the publisher's signing certificate through a
//! [`CertificateSource`] and checking the RSA-SHA1 signature against the
//! certificate's public key.

mod certs;
mod envelope;
mod signing;
mod verify;

pub mod error;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use certs::{CertCache, CertificateSource};
pub use envelope::{Envelope, MessageType};
pub use error::{Error, Result};
pub use signing::string_to_sign;
pub use verify::{Verifier, public_key_from_pem};
