//! Error type for `relay-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] relay_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A statement inside a batch failed and the transaction was rolled back.
  #[error("batch aborted: {0}")]
  BatchAborted(#[source] rusqlite::Error),

  /// A statement inside a batch failed, and so did the rollback.
  #[error("batch aborted: {source}; rollback also failed: {rollback}")]
  RollbackFailed {
    #[source]
    source:   rusqlite::Error,
    rollback: rusqlite::Error,
  },

  #[error("index row for event {id} could not be updated")]
  IndexRowMissing { id: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
