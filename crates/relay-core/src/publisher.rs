//! The registry's event-notifier message schema and its normalisation into
//! an [`Event`].
//!
//! The message arrives as the `Message` string of a notification envelope,
//! or as one JSON file per event in a bulk export.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

use crate::{Event, Result};

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Top-level event-notifier message.
#[derive(Debug, Clone, Deserialize)]
pub struct EventNotifierMessage {
  #[serde(default)]
  pub event_reference:  Option<i64>,
  #[serde(default)]
  pub event_type:       Option<String>,
  pub object_reference: String,
  #[serde(default)]
  pub object_type:      Option<String>,
  #[serde(default)]
  pub event_time:       Option<DateTime<Utc>>,
  pub object_data:      ObjectData,
}

/// The `object_data` payload. Every field is optional on the wire; which
/// ones are populated depends on the object type (activity, permit,
/// section 58).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectData {
  pub activity_reference_number:   Option<String>,
  pub work_reference_number:       Option<String>,
  pub section_58_reference_number: Option<String>,
  pub permit_reference_number:     Option<String>,

  #[serde(deserialize_with = "text_or_number")]
  pub usrn:                       Option<String>,
  pub street_name:                Option<String>,
  pub area_name:                  Option<String>,
  pub town:                       Option<String>,
  pub highway_authority:          Option<String>,
  #[serde(deserialize_with = "text_or_number")]
  pub highway_authority_swa_code: Option<String>,
  #[serde(deserialize_with = "text_or_number")]
  pub promoter_swa_code:          Option<String>,
  pub promoter_organisation:      Option<String>,

  pub activity_coordinates:          Option<String>,
  pub activity_location_type:        Option<String>,
  pub activity_location_description: Option<String>,
  pub works_location_coordinates:    Option<String>,
  pub works_location_type:           Option<String>,
  pub section_58_coordinates:        Option<String>,
  pub section_58_location_type:      Option<String>,

  pub work_category:                       Option<String>,
  pub work_category_ref:                   Option<String>,
  pub work_status:                         Option<String>,
  pub work_status_ref:                     Option<String>,
  pub traffic_management_type:             Option<String>,
  pub traffic_management_type_ref:         Option<String>,
  pub current_traffic_management_type:     Option<String>,
  pub current_traffic_management_type_ref: Option<String>,
  #[serde(deserialize_with = "text_or_number")]
  pub road_category:                       Option<String>,
  pub activity_type:                       Option<String>,
  pub activity_type_details:               Option<String>,
  pub section_58_status:                   Option<String>,
  pub section_58_duration:                 Option<String>,
  pub section_58_extent:                   Option<String>,
  pub permit_status:                       Option<String>,

  pub proposed_start_date:                    Option<DateTime<FixedOffset>>,
  pub proposed_end_date:                      Option<DateTime<FixedOffset>>,
  pub proposed_start_time:                    Option<DateTime<FixedOffset>>,
  pub proposed_end_time:                      Option<DateTime<FixedOffset>>,
  pub actual_start_date_time:                 Option<DateTime<FixedOffset>>,
  pub actual_end_date_time:                   Option<DateTime<FixedOffset>>,
  pub start_date:                             Option<DateTime<FixedOffset>>,
  pub start_time:                             Option<DateTime<FixedOffset>>,
  pub end_date:                               Option<DateTime<FixedOffset>>,
  pub end_time:                               Option<DateTime<FixedOffset>>,
  pub current_traffic_management_update_date: Option<DateTime<FixedOffset>>,

  pub is_ttro_required:            Option<String>,
  pub is_covid_19_response:        Option<String>,
  pub is_traffic_sensitive:        Option<String>,
  pub is_deemed:                   Option<String>,
  pub collaborative_working:       Option<String>,
  pub cancelled:                   Option<String>,
  pub traffic_management_required: Option<String>,

  pub permit_conditions:      Option<String>,
  pub collaboration_type:     Option<String>,
  pub collaboration_type_ref: Option<String>,
  pub close_footway:          Option<String>,
  pub close_footway_ref:      Option<String>,
}

/// Identifiers the registry emits either as JSON strings or as numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s)),
    Some(Value::Number(n)) => Ok(Some(n.to_string())),
    Some(other) => Err(D::Error::custom(format!(
      "expected a string or number, found {other}"
    ))),
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

impl EventNotifierMessage {
  pub fn from_json(json: &[u8]) -> Result<Self> { Ok(serde_json::from_slice(json)?) }

  /// Map into the internal shape. Fails when the event carries no usable
  /// geometry, since such an event could never be found by a search.
  pub fn normalise(self) -> Result<Event> {
    let d = self.object_data;
    let event = Event {
      id:               0,
      object_reference: self.object_reference,
      event_type:       self.event_type,

      activity_reference_number:   d.activity_reference_number,
      work_reference_number:       d.work_reference_number,
      section_58_reference_number: d.section_58_reference_number,
      permit_reference_number:     d.permit_reference_number,

      usrn:                       d.usrn,
      street_name:                d.street_name,
      area_name:                  d.area_name,
      town:                       d.town,
      highway_authority:          d.highway_authority,
      highway_authority_swa_code: d.highway_authority_swa_code,
      promoter_swa_code:          d.promoter_swa_code,
      promoter_organisation:      d.promoter_organisation,

      activity_coordinates:          d.activity_coordinates,
      activity_location_type:        d.activity_location_type,
      activity_location_description: d.activity_location_description,
      works_location_coordinates:    d.works_location_coordinates,
      works_location_type:           d.works_location_type,
      section_58_coordinates:        d.section_58_coordinates,
      section_58_location_type:      d.section_58_location_type,

      work_category:                       d.work_category,
      work_category_ref:                   d.work_category_ref,
      work_status:                         d.work_status,
      work_status_ref:                     d.work_status_ref,
      traffic_management_type:             d.traffic_management_type,
      traffic_management_type_ref:         d.traffic_management_type_ref,
      current_traffic_management_type:     d.current_traffic_management_type,
      current_traffic_management_type_ref: d.current_traffic_management_type_ref,
      road_category:                       d.road_category,
      activity_type:                       d.activity_type,
      activity_type_details:               d.activity_type_details,
      section_58_status:                   d.section_58_status,
      section_58_duration:                 d.section_58_duration,
      section_58_extent:                   d.section_58_extent,
      permit_status:                       d.permit_status,

      proposed_start_date:                    d.proposed_start_date,
      proposed_end_date:                      d.proposed_end_date,
      proposed_start_time:                    d.proposed_start_time,
      proposed_end_time:                      d.proposed_end_time,
      actual_start_date_time:                 d.actual_start_date_time,
      actual_end_date_time:                   d.actual_end_date_time,
      start_date:                             d.start_date,
      start_time:                             d.start_time,
      end_date:                               d.end_date,
      end_time:                               d.end_time,
      current_traffic_management_update_date: d.current_traffic_management_update_date,

      is_ttro_required:            d.is_ttro_required,
      is_covid_19_response:        d.is_covid_19_response,
      is_traffic_sensitive:        d.is_traffic_sensitive,
      is_deemed:                   d.is_deemed,
      collaborative_working:       d.collaborative_working,
      cancelled:                   d.cancelled,
      traffic_management_required: d.traffic_management_required,

      permit_conditions:      d.permit_conditions,
      collaboration_type:     d.collaboration_type,
      collaboration_type_ref: d.collaboration_type_ref,
      close_footway:          d.close_footway,
      close_footway_ref:      d.close_footway_ref,
    };

    event.bounding_box()?;
    Ok(event)
  }
}
