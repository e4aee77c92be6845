//! [`SqliteStore`], the SQLite implementation of [`EventStore`].

use std::{collections::BTreeMap, path::Path, sync::LazyLock, time::Duration};

use chrono::Utc;
use rusqlite::{Connection, Transaction, params, params_from_iter, types::Value};
use tracing::{debug, info};

use relay_core::{
  BBox, Event,
  query::{Facet, IndexReport, RefData, SearchQuery, TERMINAL_WORK_STATUSES, days_before},
  store::{EventStore, PendingUpsert},
};

use crate::{
  Error, Result,
  encode::{
    COLUMNS, EFFECTIVE_END, RawIndexRow, decode_event, encode_event, encode_instant, select_list,
  },
  schema::SCHEMA,
};

/// Stored and recomputed bboxes closer than this on every edge are equal.
/// The R-tree keeps 32-bit floats, so exact comparison would always differ.
const INDEX_TOLERANCE: f64 = 1.0;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── SQL ─────────────────────────────────────────────────────────────────────

static UPSERT_SQL: LazyLock<String> = LazyLock::new(|| {
  let placeholders = (1..=COLUMNS.len())
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  let updates = COLUMNS
    .iter()
    .filter(|c| **c != "object_reference")
    .map(|c| format!("{c} = excluded.{c}"))
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "INSERT INTO events ({}) VALUES ({placeholders})
     ON CONFLICT(object_reference) DO UPDATE SET {updates}
     RETURNING id",
    COLUMNS.join(", "),
  )
});

const CLEAR_INDEX_SQL: &str = "DELETE FROM events_rtree WHERE id = ?1";

const INSERT_INDEX_SQL: &str =
  "INSERT INTO events_rtree (id, minx, maxx, miny, maxy) VALUES (?1, ?2, ?3, ?4, ?5)";

/// Parameters: `?1..?4` the query bbox as `(maxx, minx, maxy, miny)`,
/// `?5`/`?6` the temporal window, then one JSON array (or NULL) per facet in
/// [`Facet::all`] order.
static SEARCH_SQL: LazyLock<String> = LazyLock::new(|| {
  let facets = Facet::all()
    .enumerate()
    .map(|(i, facet)| {
      let p = i + 7;
      format!("\n   AND (?{p} IS NULL OR e.{facet} IN (SELECT value FROM json_each(?{p})))")
    })
    .collect::<String>();
  format!(
    "SELECT {}
     FROM events e
     JOIN events_rtree r ON r.id = e.id
     WHERE r.minx <= ?1 AND r.maxx >= ?2
       AND r.miny <= ?3 AND r.maxy >= ?4
       AND julianday({EFFECTIVE_END}) BETWEEN julianday(?5) AND julianday(?6){facets}",
    select_list(),
  )
});

static REF_DATA_SQL: LazyLock<String> = LazyLock::new(|| {
  Facet::all()
    .map(|facet| {
      format!(
        "SELECT '{facet}', COALESCE({facet}, ''), COUNT(*) FROM events GROUP BY COALESCE({facet}, '')"
      )
    })
    .collect::<Vec<_>>()
    .join("\nUNION ALL\n")
});

const INDEX_ROWS_SQL: &str = "
  SELECT e.id, e.object_reference,
         e.works_location_coordinates, e.activity_coordinates, e.section_58_coordinates,
         r.id, r.minx, r.maxx, r.miny, r.maxy
  FROM events e
  LEFT JOIN events_rtree r ON r.id = e.id";

const UPDATE_INDEX_SQL: &str =
  "UPDATE events_rtree SET minx = ?2, maxx = ?3, miny = ?4, maxy = ?5 WHERE id = ?1";

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Bind values for [`SEARCH_SQL`] evaluated at `now`.
///
/// The overlap test reads `stored.min <= query.max AND stored.max >=
/// query.min`, so the bbox goes in as `(maxx, minx, maxy, miny)`.
pub(crate) fn search_params(
  query: &SearchQuery,
  now: chrono::DateTime<Utc>,
) -> Result<Vec<Value>> {
  let (from, to) = query.temporal.window(now)?;
  let mut values = vec![
    Value::Real(query.bbox.max_x),
    Value::Real(query.bbox.min_x),
    Value::Real(query.bbox.max_y),
    Value::Real(query.bbox.min_y),
    Value::Text(encode_instant(from)),
    Value::Text(encode_instant(to)),
  ];
  for facet in Facet::all() {
    let list = query.facets.values(facet);
    values.push(if list.is_empty() {
      Value::Null
    } else {
      Value::Text(serde_json::to_string(list)?)
    });
  }
  Ok(values)
}

fn upsert_all(tx: &Transaction<'_>, rows: &[(Vec<Value>, BBox)]) -> rusqlite::Result<Vec<i64>> {
  let mut upsert = tx.prepare_cached(&UPSERT_SQL)?;
  let mut clear = tx.prepare_cached(CLEAR_INDEX_SQL)?;
  let mut index = tx.prepare_cached(INSERT_INDEX_SQL)?;

  let mut ids = Vec::with_capacity(rows.len());
  for (values, bbox) in rows {
    let id: i64 = upsert.query_row(params_from_iter(values.iter()), |r| r.get(0))?;
    clear.execute([id])?;
    index.execute(params![id, bbox.min_x, bbox.max_x, bbox.min_y, bbox.max_y])?;
    ids.push(id);
  }
  Ok(ids)
}

fn regenerate(tx: &Transaction<'_>) -> Result<IndexReport> {
  let rows = {
    let mut stmt = tx.prepare(INDEX_ROWS_SQL)?;
    stmt
      .query_map([], |row| {
        let indexed: Option<i64> = row.get(5)?;
        Ok(RawIndexRow {
          id:                         row.get(0)?,
          object_reference:           row.get(1)?,
          works_location_coordinates: row.get(2)?,
          activity_coordinates:       row.get(3)?,
          section_58_coordinates:     row.get(4)?,
          stored:                     match indexed {
            Some(_) => Some([row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?]),
            None => None,
          },
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  let mut update = tx.prepare(UPDATE_INDEX_SQL)?;
  let mut insert = tx.prepare(INSERT_INDEX_SQL)?;
  let mut report = IndexReport::default();

  for row in rows {
    report.total += 1;
    let bbox = row.geometry_event().bounding_box()?;

    match row.stored {
      Some([min_x, max_x, min_y, max_y]) => {
        let stored = BBox { min_x, max_x, min_y, max_y };
        if stored.equals(&bbox, INDEX_TOLERANCE) {
          continue;
        }
        debug!(id = row.id, ?stored, ?bbox, "index row out of date");
        let n = update.execute(params![row.id, bbox.min_x, bbox.max_x, bbox.min_y, bbox.max_y])?;
        if n != 1 {
          return Err(Error::IndexRowMissing { id: row.id });
        }
      }
      None => {
        debug!(id = row.id, ?bbox, "index row missing");
        insert.execute(params![row.id, bbox.min_x, bbox.max_x, bbox.min_y, bbox.max_y])?;
      }
    }
    report.affected += 1;
  }

  Ok(report)
}

fn completed_ids(conn: &Connection, cutoff: &str) -> rusqlite::Result<Vec<i64>> {
  let statuses = TERMINAL_WORK_STATUSES
    .iter()
    .map(|s| format!("'{s}'"))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "SELECT e.id FROM events e
     WHERE e.work_status_ref IN ({statuses})
       AND julianday({EFFECTIVE_END}) < julianday(?1)
     ORDER BY e.id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let ids = stmt.query_map([cutoff], |r| r.get(0))?.collect();
  ids
}

/// Roll back after a failed batch, chaining the rollback error if it also
/// fails.
fn abort(tx: Transaction<'_>, source: rusqlite::Error) -> Error {
  match tx.rollback() {
    Ok(()) => Error::BatchAborted(source),
    Err(rollback) => Error::RollbackFailed { source, rollback },
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An event store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. WAL journaling and a busy timeout
  /// are configured on every open; the schema only when it is missing.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init().await?;
    info!(path = %path.display(), "database ready");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let _mode: String =
          conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;

        let exists: bool = conn.query_row(
          "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'events')",
          [],
          |r| r.get(0),
        )?;
        if !exists {
          conn.execute_batch(SCHEMA)?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn commit_upserts(&self, batch: Vec<PendingUpsert>) -> Result<Vec<i64>> {
    let rows: Vec<(Vec<Value>, BBox)> = batch
      .iter()
      .map(|p| (encode_event(&p.event), p.bbox))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(match upsert_all(&tx, &rows) {
          Ok(ids) => tx.commit().map(|()| ids).map_err(Error::Sqlite),
          Err(e) => Err(abort(tx, e)),
        })
      })
      .await?
  }

  async fn regenerate_index(&self) -> Result<IndexReport> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        // An early return drops `tx`, which rolls back.
        Ok(regenerate(&tx).and_then(|report| {
          tx.commit()?;
          Ok(report)
        }))
      })
      .await?
  }

  async fn delete_completed(&self, older_than_days: u32, dry_run: bool) -> Result<Vec<i64>> {
    let cutoff = encode_instant(days_before(Utc::now(), older_than_days)?);
    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids = completed_ids(&tx, &cutoff)?;
        if dry_run || ids.is_empty() {
          return Ok(ids);
        }
        {
          let mut events = tx.prepare("DELETE FROM events WHERE id = ?1")?;
          let mut index = tx.prepare(CLEAR_INDEX_SQL)?;
          for id in &ids {
            events.execute([id])?;
            index.execute([id])?;
          }
        }
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    debug!(count = ids.len(), dry_run, "completed events selected");
    Ok(ids)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn search(&self, query: &SearchQuery) -> Result<Vec<Event>> {
    let values = search_params(query, Utc::now())?;

    let events = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&SEARCH_SQL)?;
        let rows = stmt
          .query_map(params_from_iter(values.iter()), decode_event)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(events)
  }

  async fn ref_data(&self) -> Result<RefData> {
    let rows: Vec<(String, String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare_cached(&REF_DATA_SQL)?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut ref_data = RefData::new();
    for (facet, value, count) in rows {
      let count = u64::try_from(count).unwrap_or_default();
      ref_data.entry(facet).or_insert_with(BTreeMap::new).insert(value, count);
    }
    Ok(ref_data)
  }

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
