//! Bulk import of exported registry events, one JSON file per event.

use std::{
  fs, io,
  path::{Path, PathBuf},
};

use relay_core::{publisher::EventNotifierMessage, store::EventStore};
use thiserror::Error;
use tracing::info;

const PROGRESS_EVERY: usize = 1000;

#[derive(Debug, Error)]
pub enum BulkError<E: std::error::Error + 'static> {
  #[error("failed to walk {}: {source}", path.display())]
  Walk { path: PathBuf, source: io::Error },

  #[error("could not read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("could not load event from {}: {source}", path.display())]
  Event { path: PathBuf, source: relay_core::Error },

  #[error("batch commit failed: {0}")]
  Store(#[source] E),
}

/// Every regular file under `root`, recursively, in sorted path order, cut
/// to the first `max_files` when given.
pub fn collect_files(root: &Path, max_files: Option<usize>) -> io::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  walk(root, &mut files)?;
  files.sort();
  if let Some(max) = max_files {
    files.truncate(max);
  }
  Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    let file_type = entry.file_type()?;
    if file_type.is_dir() {
      walk(&entry.path(), files)?;
    } else if file_type.is_file() {
      files.push(entry.path());
    }
  }
  Ok(())
}

/// Parse, normalise and upsert every file under `root` in one batch. The
/// first failure discards the whole batch. Returns the number of events
/// committed.
pub async fn load_folder<S: EventStore>(
  store: &S,
  root: &Path,
  max_files: Option<usize>,
) -> Result<usize, BulkError<S::Error>> {
  let files = collect_files(root, max_files)
    .map_err(|source| BulkError::Walk { path: root.to_owned(), source })?;
  info!(files = files.len(), root = %root.display(), "importing");

  let mut batch = store.batch_upsert();
  for (idx, path) in files.iter().enumerate() {
    let raw = match fs::read(path) {
      Ok(raw) => raw,
      Err(source) => return Err(batch.abort(BulkError::Read { path: path.clone(), source })),
    };
    let loaded = EventNotifierMessage::from_json(&raw)
      .and_then(EventNotifierMessage::normalise)
      .and_then(|event| batch.upsert(event));
    if let Err(source) = loaded {
      return Err(batch.abort(BulkError::Event { path: path.clone(), source }));
    }
    if (idx + 1) % PROGRESS_EVERY == 0 {
      info!(processed = idx + 1, "import progress");
    }
  }

  let count = batch.len();
  batch.done().await.map_err(BulkError::Store)?;
  info!(count, "import committed");
  Ok(count)
}
