//! Signing-certificate retrieval.

use std::{future::Future, sync::Arc, time::Duration};

use moka::future::Cache;
use reqwest::{StatusCode, Url};
use tracing::{debug, info};

use crate::{Error, Result};

/// Where the verifier gets a certificate PEM for a `SigningCertURL`.
pub trait CertificateSource: Send + Sync {
  fn certificate<'a>(&'a self, url: &'a str) -> impl Future<Output = Result<Arc<str>>> + Send + 'a;
}

/// An HTTPS fetcher with a per-URL TTL cache.
///
/// Entries live for `ttl` and are evicted early after `idle` without a read.
/// Concurrent lookups of the same URL share one fetch. Failed fetches are
/// not cached.
#[derive(Debug, Clone)]
pub struct CertCache {
  client:     reqwest::Client,
  cache:      Cache<String, Arc<str>>,
  allow_http: bool,
}

impl CertCache {
  pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
  pub const DEFAULT_IDLE: Duration = Duration::from_secs(60 * 60);

  pub fn new(client: reqwest::Client, ttl: Duration, idle: Duration) -> Self {
    let cache = Cache::builder()
      .time_to_live(ttl)
      .time_to_idle(idle)
      .build();
    Self { client, cache, allow_http: false }
  }

  /// Accept plain-HTTP certificate URLs, so a local mock server can stand in
  /// for the publisher.
  #[cfg(any(test, feature = "test-util"))]
  pub fn allow_http(mut self) -> Self {
    self.allow_http = true;
    self
  }

  fn check_url(&self, url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|_| Error::InsecureCertUrl(url.to_owned()))?;
    match parsed.scheme() {
      "https" => Ok(()),
      "http" if self.allow_http => Ok(()),
      _ => Err(Error::InsecureCertUrl(url.to_owned())),
    }
  }
}

impl CertificateSource for CertCache {
  async fn certificate(&self, url: &str) -> Result<Arc<str>> {
    self.check_url(url)?;
    self
      .cache
      .try_get_with(url.to_owned(), fetch_pem(&self.client, url))
      .await
      .map_err(Error::Shared)
  }
}

async fn fetch_pem(client: &reqwest::Client, url: &str) -> Result<Arc<str>> {
  debug!(url, "fetching signing certificate");
  let response = client.get(url).send().await?;
  if response.status() != StatusCode::OK {
    return Err(Error::FetchStatus { url: url.to_owned(), status: response.status().as_u16() });
  }
  let pem = response.text().await?;
  info!(url, "signing certificate cached");
  Ok(Arc::from(pem))
}
