//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use relay_core::{
  BBox, Event,
  query::{Facet, SearchQuery, TemporalFilters},
  store::EventStore,
};
use rusqlite::types::Value;

use crate::{Error, SqliteStore, encode::COLUMNS, store::search_params};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn days_from_now(days: i64) -> DateTime<FixedOffset> {
  (Utc::now() + Duration::days(days)).into()
}

/// An event at `wkt` that ends tomorrow, inside the default search window.
fn event(reference: &str, wkt: &str) -> Event {
  Event {
    object_reference: reference.into(),
    event_type: Some("ACTIVITY_CREATED".into()),
    activity_coordinates: Some(wkt.into()),
    end_date: Some(days_from_now(1)),
    ..Default::default()
  }
}

async fn put(s: &SqliteStore, events: Vec<Event>) -> Vec<i64> {
  let mut batch = s.batch_upsert();
  for e in events {
    batch.upsert(e).unwrap();
  }
  batch.done().await.unwrap()
}

async fn count(s: &SqliteStore, table: &'static str) -> i64 {
  s.conn
    .call(move |c| Ok(c.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?))
    .await
    .unwrap()
}

async fn stored_bbox(s: &SqliteStore, id: i64) -> Option<BBox> {
  s.conn
    .call(move |c| {
      let mut stmt = c.prepare("SELECT minx, maxx, miny, maxy FROM events_rtree WHERE id = ?1")?;
      let mut rows = stmt.query([id])?;
      Ok(match rows.next()? {
        Some(r) => Some(BBox {
          min_x: r.get(0)?,
          max_x: r.get(1)?,
          min_y: r.get(2)?,
          max_y: r.get(3)?,
        }),
        None => None,
      })
    })
    .await
    .unwrap()
}

async fn exec(s: &SqliteStore, sql: &'static str) {
  s.conn
    .call(move |c| {
      c.execute_batch(sql)?;
      Ok(())
    })
    .await
    .unwrap();
}

async fn search(s: &SqliteStore, bbox: &str) -> Vec<Event> {
  s.search(&SearchQuery::new(bbox.parse().unwrap())).await.unwrap()
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_columns_match_bind_order() {
  let s = store().await;
  let names: Vec<String> = s
    .conn
    .call(|c| {
      let mut stmt = c.prepare("SELECT name FROM pragma_table_info('events') ORDER BY cid")?;
      let names = stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(names)
    })
    .await
    .unwrap();

  assert_eq!(names[0], "id");
  assert_eq!(&names[1..], COLUMNS);
}

#[tokio::test]
async fn reopening_keeps_data_and_uses_wal() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("events.db");

  let s = SqliteStore::open(&path).await.unwrap();
  put(&s, vec![event("A", "POINT(1 1)")]).await;
  drop(s);

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(count(&s, "events").await, 1);
  let mode: String = s
    .conn
    .call(|c| Ok(c.query_row("PRAGMA journal_mode", [], |r| r.get(0))?))
    .await
    .unwrap();
  assert_eq!(mode, "wal");
}

#[tokio::test]
async fn ping_answers() {
  store().await.ping().await.unwrap();
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_writes_row_and_index() {
  let s = store().await;
  let ids = put(&s, vec![event("A", "LINESTRING(526977.67 181798.94, 528476.98 179982.13)")]).await;
  assert_eq!(ids.len(), 1);

  assert_eq!(count(&s, "events").await, 1);
  assert_eq!(count(&s, "events_rtree").await, 1);
  let stored = stored_bbox(&s, ids[0]).await.unwrap();
  assert!(stored.equals(
    &BBox { min_x: 526977.67, max_x: 528476.98, min_y: 179982.13, max_y: 181798.94 },
    1.0,
  ));
}

#[tokio::test]
async fn upsert_is_idempotent_on_object_reference() {
  let s = store().await;
  let first = put(&s, vec![event("A", "POINT(10 10)")]).await;
  let second = put(&s, vec![event("A", "POINT(10 10)")]).await;
  assert_eq!(first, second);
  assert_eq!(count(&s, "events").await, 1);
  assert_eq!(count(&s, "events_rtree").await, 1);

  let moved = put(&s, vec![event("A", "POINT(500 700)")]).await;
  assert_eq!(moved, first);
  assert_eq!(count(&s, "events").await, 1);
  assert_eq!(count(&s, "events_rtree").await, 1);
  let stored = stored_bbox(&s, first[0]).await.unwrap();
  assert!(stored.equals(&BBox::from_corners(500.0, 700.0, 500.0, 700.0), 1.0));

  let hits = search(&s, "499,699,501,701").await;
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].activity_coordinates.as_deref(), Some("POINT(500 700)"));
}

#[tokio::test]
async fn update_replaces_every_column() {
  let s = store().await;
  let mut e = event("A", "POINT(1 1)");
  e.street_name = Some("HIGH STREET".into());
  e.permit_status = Some("submitted".into());
  put(&s, vec![e.clone()]).await;

  e.street_name = None;
  e.permit_status = Some("granted".into());
  put(&s, vec![e]).await;

  let hits = search(&s, "0,0,2,2").await;
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].street_name, None);
  assert_eq!(hits[0].permit_status.as_deref(), Some("granted"));
}

#[tokio::test]
async fn fields_round_trip() {
  let s = store().await;
  let offset = DateTime::parse_from_rfc3339("2030-06-12T09:30:00+01:00").unwrap();
  let e = Event {
    work_reference_number: Some("TSR1591199404915".into()),
    usrn: Some("8400868".into()),
    is_traffic_sensitive: Some("Not provided".into()),
    proposed_start_date: Some(offset),
    ..event("A", "POINT(5 5)")
  };
  let ids = put(&s, vec![e.clone()]).await;

  let hits = search(&s, "0,0,10,10").await;
  assert_eq!(hits, [Event { id: ids[0], ..e }]);
  assert_eq!(
    hits[0].proposed_start_date.unwrap().offset().local_minus_utc(),
    3600,
  );
}

#[tokio::test]
async fn failed_batch_leaves_no_rows() {
  let s = store().await;
  exec(
    &s,
    "CREATE TRIGGER reject_b BEFORE INSERT ON events WHEN NEW.object_reference = 'B'
     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
  )
  .await;

  let mut batch = s.batch_upsert();
  batch.upsert(event("A", "POINT(1 1)")).unwrap();
  batch.upsert(event("B", "POINT(2 2)")).unwrap();
  let err = batch.done().await.unwrap_err();

  assert!(matches!(err, Error::BatchAborted(_)), "{err}");
  assert_eq!(count(&s, "events").await, 0);
  assert_eq!(count(&s, "events_rtree").await, 0);

  // The store is still usable afterwards.
  put(&s, vec![event("A", "POINT(1 1)")]).await;
  assert_eq!(count(&s, "events").await, 1);
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn point_inside_and_outside_query() {
  let s = store().await;
  put(&s, vec![event("A", "POINT(50 50)")]).await;

  let hits = search(&s, "0,0,100,100").await;
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].object_reference, "A");

  assert!(search(&s, "200,200,300,300").await.is_empty());
}

#[tokio::test]
async fn partial_overlap_matches() {
  let s = store().await;
  put(&s, vec![event("A", "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))")]).await;

  // Overlaps one corner; neither box contains the other.
  assert_eq!(search(&s, "5,5,20,20").await.len(), 1);
  assert_eq!(search(&s, "-20,-20,5,5").await.len(), 1);
  // Fully inside the stored box.
  assert_eq!(search(&s, "2,2,3,3").await.len(), 1);
  // Disjoint on one axis only.
  assert!(search(&s, "11,0,20,10").await.is_empty());
  assert!(search(&s, "0,11,10,20").await.is_empty());
}

#[test]
fn search_params_put_bbox_in_overlap_order() {
  let query = SearchQuery::new(BBox { min_x: 1.0, max_x: 2.0, min_y: 3.0, max_y: 4.0 });
  let values = search_params(&query, Utc::now()).unwrap();

  assert_eq!(&values[..4], &[
    Value::Real(2.0),
    Value::Real(1.0),
    Value::Real(4.0),
    Value::Real(3.0),
  ]);
  assert_eq!(values.len(), 6 + Facet::all().count());
  assert!(values[6..].iter().all(|v| *v == Value::Null));
}

#[tokio::test]
async fn facets_or_within_and_across() {
  let s = store().await;
  let mut a = event("A", "POINT(1 1)");
  a.permit_status = Some("granted".into());
  a.highway_authority = Some("CITY OF YORK".into());
  let mut b = event("B", "POINT(2 2)");
  b.permit_status = Some("submitted".into());
  b.highway_authority = Some("CITY OF YORK".into());
  let mut c = event("C", "POINT(3 3)");
  c.permit_status = Some("granted".into());
  c.highway_authority = Some("LEEDS".into());
  put(&s, vec![a, b, c]).await;

  let refs = |hits: Vec<Event>| {
    let mut r: Vec<String> = hits.into_iter().map(|e| e.object_reference).collect();
    r.sort();
    r
  };

  let mut q = SearchQuery::new("0,0,10,10".parse().unwrap());
  q.facets.permit_status = vec!["granted".into()];
  assert_eq!(refs(s.search(&q).await.unwrap()), ["A", "C"]);

  q.facets.permit_status = vec!["granted".into(), "submitted".into()];
  assert_eq!(refs(s.search(&q).await.unwrap()), ["A", "B", "C"]);

  q.facets.highway_authority = vec!["CITY OF YORK".into()];
  assert_eq!(refs(s.search(&q).await.unwrap()), ["A", "B"]);

  q.facets.work_status_ref = vec!["completed".into()];
  assert!(s.search(&q).await.unwrap().is_empty());
}

#[tokio::test]
async fn temporal_window_uses_effective_end() {
  let s = store().await;

  let mut ended_yesterday = event("YESTERDAY", "POINT(1 1)");
  ended_yesterday.end_date = Some(days_from_now(-1));

  let mut next_month = event("NEXT-MONTH", "POINT(1 1)");
  next_month.end_date = Some(days_from_now(30));

  // Actual end wins over the planned one.
  let mut finished_early = event("EARLY", "POINT(1 1)");
  finished_early.end_date = Some(days_from_now(2));
  finished_early.actual_end_date_time = Some(days_from_now(-3));

  let mut open_ended = event("OPEN", "POINT(1 1)");
  open_ended.end_date = None;

  put(&s, vec![event("TOMORROW", "POINT(1 1)"), ended_yesterday, next_month, finished_early, open_ended]).await;

  let refs = |hits: Vec<Event>| {
    let mut r: Vec<String> = hits.into_iter().map(|e| e.object_reference).collect();
    r.sort();
    r
  };

  let mut q = SearchQuery::new("0,0,2,2".parse().unwrap());
  assert_eq!(refs(s.search(&q).await.unwrap()), ["TOMORROW"]);

  q.temporal = TemporalFilters { max_days_ahead: 31, max_days_behind: 2 };
  assert_eq!(refs(s.search(&q).await.unwrap()), ["NEXT-MONTH", "TOMORROW", "YESTERDAY"]);

  q.temporal = TemporalFilters { max_days_ahead: 0, max_days_behind: 5 };
  assert_eq!(refs(s.search(&q).await.unwrap()), ["EARLY", "YESTERDAY"]);
}

// ─── Ref data ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ref_data_counts_values_per_facet() {
  let s = store().await;
  let mut a = event("A", "POINT(1 1)");
  a.permit_status = Some("granted".into());
  let mut b = event("B", "POINT(1 1)");
  b.permit_status = Some("granted".into());
  let mut c = event("C", "POINT(1 1)");
  c.permit_status = Some(String::new());
  put(&s, vec![a, b, c, event("D", "POINT(1 1)")]).await;

  let ref_data = s.ref_data().await.unwrap();
  assert_eq!(ref_data.len(), Facet::all().count());

  let permit = &ref_data["permit_status"];
  assert_eq!(permit["granted"], 2);
  // NULL and empty string share a key.
  assert_eq!(permit[""], 2);

  assert_eq!(ref_data["road_category"][""], 4);
}

#[tokio::test]
async fn ref_data_on_empty_store() {
  assert!(store().await.ref_data().await.unwrap().is_empty());
}

// ─── Index regeneration ──────────────────────────────────────────────────────

#[tokio::test]
async fn regenerate_repairs_and_is_a_fixed_point() {
  let s = store().await;
  let ids = put(&s, vec![
    event("A", "POINT(10 10)"),
    event("B", "POINT(20 20)"),
    event("C", "POINT(30 30)"),
  ])
  .await;

  let report = s.regenerate_index().await.unwrap();
  assert_eq!((report.affected, report.total), (0, 3));

  exec(&s, "UPDATE events_rtree SET minx = 900, maxx = 901 WHERE id = 1").await;
  exec(&s, "DELETE FROM events_rtree WHERE id = 2").await;

  let report = s.regenerate_index().await.unwrap();
  assert_eq!((report.affected, report.total), (2, 3));
  assert_eq!(count(&s, "events_rtree").await, 3);
  for (id, at) in ids.iter().zip([10.0, 20.0, 30.0]) {
    let stored = stored_bbox(&s, *id).await.unwrap();
    assert!(stored.equals(&BBox::from_corners(at, at, at, at), 1.0));
  }

  let report = s.regenerate_index().await.unwrap();
  assert_eq!(report.affected, 0);
}

#[tokio::test]
async fn regenerate_follows_geometry_priority() {
  let s = store().await;
  let mut e = event("A", "POINT(1 1)");
  e.works_location_coordinates = Some("POINT(100 100)".into());
  let ids = put(&s, vec![e]).await;

  // A row written with the lower-priority geometry is corrected.
  exec(&s, "UPDATE events_rtree SET minx = 1, maxx = 1, miny = 1, maxy = 1").await;
  let report = s.regenerate_index().await.unwrap();
  assert_eq!(report.affected, 1);
  let stored = stored_bbox(&s, ids[0]).await.unwrap();
  assert!(stored.equals(&BBox::from_corners(100.0, 100.0, 100.0, 100.0), 1.0));
}

#[tokio::test]
async fn regenerate_rolls_back_on_bad_geometry() {
  let s = store().await;
  put(&s, vec![event("A", "POINT(1 1)"), event("B", "POINT(2 2)")]).await;
  exec(&s, "UPDATE events_rtree SET minx = 500, maxx = 500").await;
  exec(&s, "UPDATE events SET activity_coordinates = 'POINT(' WHERE object_reference = 'B'").await;

  let err = s.regenerate_index().await.unwrap_err();
  assert!(matches!(err, Error::Core(_)), "{err}");

  // Nothing was rewritten, including the row processed before the failure.
  let stored = stored_bbox(&s, 1).await.unwrap();
  assert!(stored.equals(&BBox { min_x: 500.0, max_x: 500.0, min_y: 1.0, max_y: 1.0 }, 1.0));
}

// ─── Purge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_completed_dry_run_and_apply() {
  let s = store().await;

  let mut old_completed = event("OLD-COMPLETED", "POINT(1 1)");
  old_completed.work_status_ref = Some("completed".into());
  old_completed.end_date = Some(days_from_now(-40));

  let mut old_cancelled = event("OLD-CANCELLED", "POINT(1 1)");
  old_cancelled.work_status_ref = Some("cancelled".into());
  old_cancelled.proposed_end_date = Some(days_from_now(-40));
  old_cancelled.end_date = None;

  let mut recent_completed = event("RECENT", "POINT(1 1)");
  recent_completed.work_status_ref = Some("completed".into());
  recent_completed.end_date = Some(days_from_now(-2));

  let mut old_in_progress = event("IN-PROGRESS", "POINT(1 1)");
  old_in_progress.work_status_ref = Some("in_progress".into());
  old_in_progress.end_date = Some(days_from_now(-40));

  let ids = put(&s, vec![old_completed, old_cancelled, recent_completed, old_in_progress]).await;

  let dry = s.delete_completed(30, true).await.unwrap();
  assert_eq!(dry, &ids[..2]);
  assert_eq!(count(&s, "events").await, 4);

  let deleted = s.delete_completed(30, false).await.unwrap();
  assert_eq!(deleted, dry);
  assert_eq!(count(&s, "events").await, 2);
  assert_eq!(count(&s, "events_rtree").await, 2);

  assert!(s.delete_completed(30, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_completed_rejects_out_of_range_age() {
  let s = store().await;
  let mut done = event("DONE", "POINT(1 1)");
  done.work_status_ref = Some("completed".into());
  done.end_date = Some(days_from_now(-40));
  put(&s, vec![done]).await;

  let err = s.delete_completed(u32::MAX, false).await.unwrap_err();
  assert!(matches!(err, Error::Core(relay_core::Error::Temporal(_))), "{err}");
  assert_eq!(count(&s, "events").await, 1);
}

#[test]
fn search_params_reject_out_of_range_window() {
  let mut query = SearchQuery::new(BBox::from_corners(0.0, 0.0, 1.0, 1.0));
  query.temporal = TemporalFilters { max_days_ahead: u32::MAX, max_days_behind: 0 };
  let err = search_params(&query, Utc::now()).unwrap_err();
  assert!(matches!(err, Error::Core(relay_core::Error::Temporal(_))), "{err}");
}
