//! Encoding and decoding between [`Event`] and `events` rows.
//!
//! Every field is stored as TEXT. Instants are stored as RFC 3339 strings
//! keeping their original offset, which `julianday()` understands.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use relay_core::Event;
use rusqlite::{
  Row,
  types::{Type, Value},
};

// ─── Scalars ─────────────────────────────────────────────────────────────────

fn encode_text(v: &Option<String>) -> Value {
  match v {
    Some(s) => Value::Text(s.clone()),
    None => Value::Null,
  }
}

fn encode_date(v: &Option<DateTime<FixedOffset>>) -> Value {
  match v {
    Some(dt) => Value::Text(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    None => Value::Null,
  }
}

/// Instants passed as query parameters, e.g. the ends of a search window.
pub fn encode_instant(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_date(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<FixedOffset>>> {
  let Some(raw) = row.get::<_, Option<String>>(column)? else {
    return Ok(None);
  };
  DateTime::parse_from_rfc3339(&raw).map(Some).map_err(|e| {
    let idx = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
  })
}

// ─── Event rows ──────────────────────────────────────────────────────────────

macro_rules! event_columns {
  (text: [$($text:ident),* $(,)?], dates: [$($date:ident),* $(,)?] $(,)?) => {
    /// Every column written by an upsert, in bind order. `id` is not
    /// included; it is assigned by SQLite.
    pub const COLUMNS: &[&str] = &[
      "object_reference",
      "event_type",
      $(stringify!($text),)*
      $(stringify!($date),)*
    ];

    /// Bind values for [`COLUMNS`], in the same order.
    pub fn encode_event(event: &Event) -> Vec<Value> {
      let mut values = Vec::with_capacity(COLUMNS.len());
      values.push(Value::Text(event.object_reference.clone()));
      values.push(encode_text(&event.event_type));
      $(values.push(encode_text(&event.$text));)*
      $(values.push(encode_date(&event.$date));)*
      values
    }

    /// Read an event from a row that selected `id` and every [`COLUMNS`]
    /// entry by its bare name.
    pub fn decode_event(row: &Row<'_>) -> rusqlite::Result<Event> {
      Ok(Event {
        id:               row.get("id")?,
        object_reference: row.get("object_reference")?,
        event_type:       row.get("event_type")?,
        $($text: row.get(stringify!($text))?,)*
        $($date: decode_date(row, stringify!($date))?,)*
      })
    }
  };
}

event_columns! {
  text: [
    activity_reference_number,
    work_reference_number,
    section_58_reference_number,
    permit_reference_number,

    usrn,
    street_name,
    area_name,
    town,
    highway_authority,
    highway_authority_swa_code,
    promoter_swa_code,
    promoter_organisation,

    activity_coordinates,
    activity_location_type,
    activity_location_description,
    works_location_coordinates,
    works_location_type,
    section_58_coordinates,
    section_58_location_type,

    work_category,
    work_category_ref,
    work_status,
    work_status_ref,
    traffic_management_type,
    traffic_management_type_ref,
    current_traffic_management_type,
    current_traffic_management_type_ref,
    road_category,
    activity_type,
    activity_type_details,
    section_58_status,
    section_58_duration,
    section_58_extent,
    permit_status,

    is_ttro_required,
    is_covid_19_response,
    is_traffic_sensitive,
    is_deemed,
    collaborative_working,
    cancelled,
    traffic_management_required,

    permit_conditions,
    collaboration_type,
    collaboration_type_ref,
    close_footway,
    close_footway_ref,
  ],
  dates: [
    proposed_start_date,
    proposed_end_date,
    proposed_start_time,
    proposed_end_time,
    actual_start_date_time,
    actual_end_date_time,
    start_date,
    start_time,
    end_date,
    end_time,
    current_traffic_management_update_date,
  ],
}

/// `e.id, e.object_reference, ...` for statements that join `events e`.
pub fn select_list() -> String {
  std::iter::once("e.id".to_owned())
    .chain(COLUMNS.iter().map(|c| format!("e.{c}")))
    .collect::<Vec<_>>()
    .join(", ")
}

/// SQL expression for when an event stops affecting the street.
pub const EFFECTIVE_END: &str =
  "COALESCE(e.actual_end_date_time, e.end_date, e.proposed_end_date)";

// ─── Index rows ──────────────────────────────────────────────────────────────

/// A stored `events_rtree` row, read back as f64.
pub struct RawIndexRow {
  pub id:                         i64,
  pub object_reference:           String,
  pub works_location_coordinates: Option<String>,
  pub activity_coordinates:       Option<String>,
  pub section_58_coordinates:     Option<String>,
  /// `None` when the event has no index row.
  pub stored:                     Option<[f64; 4]>,
}

impl RawIndexRow {
  /// Just enough of an [`Event`] to run the geometry priority rule.
  pub fn geometry_event(&self) -> Event {
    Event {
      id: self.id,
      object_reference: self.object_reference.clone(),
      works_location_coordinates: self.works_location_coordinates.clone(),
      activity_coordinates: self.activity_coordinates.clone(),
      section_58_coordinates: self.section_58_coordinates.clone(),
      ..Default::default()
    }
  }
}
