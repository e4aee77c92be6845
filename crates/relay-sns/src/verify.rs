//! RSA-SHA1 signature verification.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rsa::{Pkcs1v15Sign, RsaPublicKey, pkcs8::DecodePublicKey as _};
use sha1::{Digest as _, Sha1};
use tracing::debug;
use x509_cert::{
  Certificate,
  der::{DecodePem as _, Encode as _},
};

use crate::{CertificateSource, Envelope, Error, Result, signing::string_to_sign};

const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

/// Extract the RSA public key from a PEM-encoded X.509 certificate.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey> {
  let cert =
    Certificate::from_pem(pem.as_bytes()).map_err(|e| Error::Certificate(e.to_string()))?;
  let spki = &cert.tbs_certificate.subject_public_key_info;

  let algorithm = spki.algorithm.oid.to_string();
  if algorithm != RSA_ENCRYPTION_OID {
    return Err(Error::NotRsa(algorithm));
  }

  let der = spki.to_der().map_err(|e| Error::Certificate(e.to_string()))?;
  RsaPublicKey::from_public_key_der(&der).map_err(|e| Error::Certificate(e.to_string()))
}

/// Checks envelopes against the publisher's signing certificate.
#[derive(Debug, Clone)]
pub struct Verifier<C> {
  certs: C,
}

impl<C: CertificateSource> Verifier<C> {
  pub fn new(certs: C) -> Self { Self { certs } }

  /// `Ok(false)` for a well-formed envelope whose signature does not match.
  /// `Err` when the envelope cannot be checked at all: an unsupported
  /// signature version or message type, or a certificate, PEM or base64
  /// failure (see [`Error::is_rejection`]).
  pub async fn verify(&self, envelope: &Envelope) -> Result<bool> {
    if envelope.signature_version != "1" {
      return Err(Error::UnsupportedSignatureVersion(envelope.signature_version.clone()));
    }
    let signed = string_to_sign(envelope)?;

    let pem = self.certs.certificate(&envelope.signing_cert_url).await?;
    let key = public_key_from_pem(&pem)?;
    let signature = STANDARD.decode(envelope.signature.trim())?;

    let digest = Sha1::digest(signed.as_bytes());
    match key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature) {
      Ok(()) => Ok(true),
      Err(e) => {
        debug!(message_id = %envelope.message_id, error = %e, "signature mismatch");
        Ok(false)
      }
    }
  }
}
