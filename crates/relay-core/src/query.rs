//! Search inputs and the ref-data aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{BBox, Error, Result};

/// Work statuses after which an event no longer affects the street.
pub const TERMINAL_WORK_STATUSES: &[&str] = &["completed", "cancelled"];

/// Largest accepted day count for a search window or purge age.
pub const MAX_DAYS: u32 = 36_500;

// ─── Facets ──────────────────────────────────────────────────────────────────

/// A filterable column. The string form is both the query parameter name and
/// the `events` column name.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
  PermitStatus,
  TrafficManagementTypeRef,
  WorkStatusRef,
  WorkCategoryRef,
  RoadCategory,
  HighwayAuthority,
  PromoterOrganisation,
}

impl Facet {
  pub fn all() -> impl Iterator<Item = Facet> { Facet::iter() }
}

/// Exact-match filters: OR within a facet, AND across facets. An empty list
/// does not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facets {
  pub permit_status:               Vec<String>,
  pub traffic_management_type_ref: Vec<String>,
  pub work_status_ref:             Vec<String>,
  pub work_category_ref:           Vec<String>,
  pub road_category:               Vec<String>,
  pub highway_authority:           Vec<String>,
  pub promoter_organisation:       Vec<String>,
}

impl Facets {
  pub fn values(&self, facet: Facet) -> &[String] {
    match facet {
      Facet::PermitStatus => &self.permit_status,
      Facet::TrafficManagementTypeRef => &self.traffic_management_type_ref,
      Facet::WorkStatusRef => &self.work_status_ref,
      Facet::WorkCategoryRef => &self.work_category_ref,
      Facet::RoadCategory => &self.road_category,
      Facet::HighwayAuthority => &self.highway_authority,
      Facet::PromoterOrganisation => &self.promoter_organisation,
    }
  }

  pub fn values_mut(&mut self, facet: Facet) -> &mut Vec<String> {
    match facet {
      Facet::PermitStatus => &mut self.permit_status,
      Facet::TrafficManagementTypeRef => &mut self.traffic_management_type_ref,
      Facet::WorkStatusRef => &mut self.work_status_ref,
      Facet::WorkCategoryRef => &mut self.work_category_ref,
      Facet::RoadCategory => &mut self.road_category,
      Facet::HighwayAuthority => &mut self.highway_authority,
      Facet::PromoterOrganisation => &mut self.promoter_organisation,
    }
  }

  /// Add every non-blank element of a comma-separated list.
  pub fn extend_csv(&mut self, facet: Facet, csv: &str) {
    self.values_mut(facet).extend(
      csv
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned),
    );
  }

  pub fn is_empty(&self) -> bool { Facet::all().all(|f| self.values(f).is_empty()) }
}

// ─── Temporal window ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFilters {
  pub max_days_ahead:  u32,
  pub max_days_behind: u32,
}

impl Default for TemporalFilters {
  fn default() -> Self { Self { max_days_ahead: 7, max_days_behind: 0 } }
}

impl TemporalFilters {
  /// Parse a day count as supplied in a query string. At most [`MAX_DAYS`].
  pub fn parse_days(name: &str, raw: &str) -> Result<u32> {
    let days = raw.trim().parse::<u32>().map_err(|_| {
      Error::Temporal(format!("{name} must be a non-negative integer, got {raw:?}"))
    })?;
    if days > MAX_DAYS {
      return Err(Error::Temporal(format!("{name} must be at most {MAX_DAYS}, got {days}")));
    }
    Ok(days)
  }

  /// Inclusive `[now - behind, now + ahead]`.
  pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((days_before(now, self.max_days_behind)?, days_after(now, self.max_days_ahead)?))
  }
}

/// `now` shifted back by `days`, failing instead of overflowing.
pub fn days_before(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
  now
    .checked_sub_signed(Duration::days(i64::from(days)))
    .ok_or_else(|| Error::Temporal(format!("{days} days before {now} is out of range")))
}

fn days_after(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
  now
    .checked_add_signed(Duration::days(i64::from(days)))
    .ok_or_else(|| Error::Temporal(format!("{days} days after {now} is out of range")))
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Parameters for [`EventStore::search`](crate::store::EventStore::search).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
  pub bbox:     BBox,
  pub facets:   Facets,
  pub temporal: TemporalFilters,
}

impl SearchQuery {
  pub fn new(bbox: BBox) -> Self {
    Self { bbox, facets: Facets::default(), temporal: TemporalFilters::default() }
  }
}

/// facet name -> observed value -> row count. NULL is reported as `""`.
pub type RefData = BTreeMap<String, BTreeMap<String, u64>>;

/// Outcome of an index regeneration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
  /// Index rows rewritten or inserted.
  pub affected: u64,
  pub total:    u64,
}

impl IndexReport {
  pub fn percent(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.affected as f64 * 100.0 / self.total as f64
    }
  }
}
