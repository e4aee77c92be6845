//! The `EventStore` trait and the batch-upsert scope built on it.
//!
//! The trait is implemented by storage backends (e.g. `relay-store-sqlite`).
//! The HTTP layer and the command-line tools depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::{
  BBox, Event,
  query::{IndexReport, RefData, SearchQuery},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// An event with the bounding box already derived from its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpsert {
  pub event: Event,
  pub bbox:  BBox,
}

/// Abstraction over a street-works event store.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Upsert every event on `object_reference` and replace its spatial index
  /// row, all in one transaction. Returns the row ids in input order.
  ///
  /// Callers normally go through [`EventStore::batch_upsert`].
  fn commit_upserts(
    &self,
    batch: Vec<PendingUpsert>,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  /// Recompute every event's bbox and rewrite index rows that differ from
  /// it by more than one unit on any edge.
  fn regenerate_index(
    &self,
  ) -> impl Future<Output = Result<IndexReport, Self::Error>> + Send + '_;

  /// Remove events with a terminal work status that ended more than
  /// `older_than_days` ago. With `dry_run` nothing is deleted. Returns the
  /// matching ids either way.
  fn delete_completed(
    &self,
    older_than_days: u32,
    dry_run: bool,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Events whose index bbox overlaps `query.bbox` and which pass every
  /// facet and temporal predicate. Order is unspecified.
  fn search<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + 'a;

  /// Value counts for every [`Facet`](crate::query::Facet) column.
  fn ref_data(&self) -> impl Future<Output = Result<RefData, Self::Error>> + Send + '_;

  /// Cheap round trip used by the liveness probe.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Batches ───────────────────────────────────────────────────────────

  fn batch_upsert(&self) -> UpsertBatch<'_, Self>
  where
    Self: Sized,
  {
    UpsertBatch { store: self, pending: Vec::new() }
  }
}

// ─── Batch ───────────────────────────────────────────────────────────────────

/// A scoped group of upserts that is applied atomically.
///
/// [`upsert`](Self::upsert) validates and stages an event, failing fast when
/// no bounding box can be derived. Nothing reaches the store until
/// [`done`](Self::done), which commits the whole batch or nothing.
/// [`abort`](Self::abort) (or simply dropping the batch) discards it. Both
/// terminal verbs consume the batch, so it cannot be reused.
#[must_use = "a batch does nothing until `done` is awaited"]
pub struct UpsertBatch<'s, S: EventStore> {
  store:   &'s S,
  pending: Vec<PendingUpsert>,
}

impl<S: EventStore> UpsertBatch<'_, S> {
  pub fn upsert(&mut self, event: Event) -> crate::Result<BBox> {
    let bbox = event.bounding_box()?;
    self.pending.push(PendingUpsert { event, bbox });
    Ok(bbox)
  }

  pub fn len(&self) -> usize { self.pending.len() }

  pub fn is_empty(&self) -> bool { self.pending.is_empty() }

  /// Commit every staged event. Returns the row ids in staging order.
  pub async fn done(self) -> Result<Vec<i64>, S::Error> {
    if self.pending.is_empty() {
      return Ok(Vec::new());
    }
    self.store.commit_upserts(self.pending).await
  }

  /// Discard the batch and hand back the error that caused it.
  pub fn abort<E>(self, err: E) -> E { err }
}
