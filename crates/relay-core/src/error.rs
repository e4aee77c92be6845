//! Error types for `relay-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to parse WKT: {0}")]
  Wkt(String),

  #[error("malformed bbox: {0}")]
  BBoxFormat(String),

  /// None of the works, activity or section 58 coordinates are present.
  #[error("event {0} has no geometry to derive a bounding box from")]
  MissingGeometry(String),

  #[error("invalid temporal filter: {0}")]
  Temporal(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
