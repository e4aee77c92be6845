//! The internal `Event` shape: one row per publisher `object_reference`.
//!
//! Closed-vocabulary fields from the publisher (statuses, categories, yes/no
//! flags) are kept as plain strings; the set of observed values is exposed
//! at runtime through [`RefData`](crate::query::RefData) rather than fixed
//! here.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{BBox, Error, Result};

/// A street-works event: an activity, a permit, or a section 58 restriction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
  /// Store-assigned row id; zero until persisted.
  #[serde(skip)]
  pub id:               i64,
  /// Publisher-assigned natural key.
  pub object_reference: String,
  pub event_type:       Option<String>,

  // ── References ──────────────────────────────────────────────────────────
  pub activity_reference_number:   Option<String>,
  pub work_reference_number:       Option<String>,
  pub section_58_reference_number: Option<String>,
  pub permit_reference_number:     Option<String>,

  // ── Location and authority ──────────────────────────────────────────────
  pub usrn:                       Option<String>,
  pub street_name:                Option<String>,
  pub area_name:                  Option<String>,
  pub town:                       Option<String>,
  pub highway_authority:          Option<String>,
  pub highway_authority_swa_code: Option<String>,
  pub promoter_swa_code:          Option<String>,
  pub promoter_organisation:      Option<String>,

  // ── Geometry (WKT) and descriptions ─────────────────────────────────────
  pub activity_coordinates:          Option<String>,
  pub activity_location_type:        Option<String>,
  pub activity_location_description: Option<String>,
  pub works_location_coordinates:    Option<String>,
  pub works_location_type:           Option<String>,
  pub section_58_coordinates:        Option<String>,
  pub section_58_location_type:      Option<String>,

  // ── Classification ──────────────────────────────────────────────────────
  pub work_category:                       Option<String>,
  pub work_category_ref:                   Option<String>,
  pub work_status:                         Option<String>,
  pub work_status_ref:                     Option<String>,
  pub traffic_management_type:             Option<String>,
  pub traffic_management_type_ref:         Option<String>,
  pub current_traffic_management_type:     Option<String>,
  pub current_traffic_management_type_ref: Option<String>,
  pub road_category:                       Option<String>,
  pub activity_type:                       Option<String>,
  pub activity_type_details:               Option<String>,
  pub section_58_status:                   Option<String>,
  pub section_58_duration:                 Option<String>,
  pub section_58_extent:                   Option<String>,
  pub permit_status:                       Option<String>,

  // ── Dates and times ─────────────────────────────────────────────────────
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

  // ── Flags ("Yes" / "No" / "Not provided") ───────────────────────────────
  pub is_ttro_required:            Option<String>,
  pub is_covid_19_response:        Option<String>,
  pub is_traffic_sensitive:        Option<String>,
  pub is_deemed:                   Option<String>,
  pub collaborative_working:       Option<String>,
  pub cancelled:                   Option<String>,
  pub traffic_management_required: Option<String>,

  // ── Misc ────────────────────────────────────────────────────────────────
  pub permit_conditions:      Option<String>,
  pub collaboration_type:     Option<String>,
  pub collaboration_type_ref: Option<String>,
  pub close_footway:          Option<String>,
  pub close_footway_ref:      Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
  field.as_deref().filter(|s| !s.trim().is_empty())
}

impl Event {
  /// The WKT the spatial index is built from: works location, then
  /// activity, then section 58. The order must not change; index
  /// regeneration relies on it too.
  pub fn geometry(&self) -> Option<&str> {
    non_empty(&self.works_location_coordinates)
      .or_else(|| non_empty(&self.activity_coordinates))
      .or_else(|| non_empty(&self.section_58_coordinates))
  }

  pub fn bounding_box(&self) -> Result<BBox> {
    let wkt = self
      .geometry()
      .ok_or_else(|| Error::MissingGeometry(self.object_reference.clone()))?;
    BBox::from_wkt(wkt)
  }

  /// When the event stops affecting the street, as used by temporal search
  /// and the completed-event purge.
  pub fn effective_end(&self) -> Option<DateTime<FixedOffset>> {
    self.actual_end_date_time.or(self.end_date).or(self.proposed_end_date)
  }
}
