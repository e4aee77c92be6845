//! Runtime configuration.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

pub const DEFAULT_ATTRIBUTION: &str =
  "Contains public sector information licensed under the Open Government Licence v3.0.";

/// Runtime server configuration, deserialised from `config.toml` and
/// `RELAY_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub db_path:           PathBuf,
  /// `id,name,url[,favicon]` rows, no header.
  pub promoters_csv:     Option<PathBuf>,
  pub attribution:       String,
  pub http_timeout_secs: u64,
  pub refdata_ttl_secs:  u64,
  pub cert_ttl_secs:     u64,
  pub cert_idle_secs:    u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "0.0.0.0".to_owned(),
      port:              8080,
      db_path:           PathBuf::from("street-manager.db"),
      promoters_csv:     None,
      attribution:       DEFAULT_ATTRIBUTION.to_owned(),
      http_timeout_secs: 10,
      refdata_ttl_secs:  600,
      cert_ttl_secs:     24 * 60 * 60,
      cert_idle_secs:    60 * 60,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("RELAY"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn http_timeout(&self) -> Duration { Duration::from_secs(self.http_timeout_secs) }

  pub fn refdata_ttl(&self) -> Duration { Duration::from_secs(self.refdata_ttl_secs) }

  pub fn cert_ttl(&self) -> Duration { Duration::from_secs(self.cert_ttl_secs) }

  pub fn cert_idle(&self) -> Duration { Duration::from_secs(self.cert_idle_secs) }
}
