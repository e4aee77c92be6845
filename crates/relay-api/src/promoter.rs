//! Promoter directory and search-result enrichment.

use std::{collections::HashMap, io, path::Path};

use relay_core::{Event, promoter::PromoterOrg};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PromoterError {
  #[error("failed to read promoter file: {0}")]
  Csv(#[from] csv::Error),

  #[error("promoter line {line}: missing {field}")]
  MissingField { line: u64, field: &'static str },

  #[error("duplicate promoter id: {0}")]
  Duplicate(String),
}

/// An [`Event`] as returned by search, with the promoter's links when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
  #[serde(flatten)]
  pub event:                Event,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub promoter_website_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub promoter_logo_url:    Option<String>,
}

/// Promoter organisations keyed by SWA code.
#[derive(Debug, Clone, Default)]
pub struct PromoterDirectory {
  by_id: HashMap<String, PromoterOrg>,
}

impl PromoterDirectory {
  /// Read `id,name,url[,favicon]` rows. There is no header row.
  pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, PromoterError> {
    let mut csv = csv::ReaderBuilder::new()
      .has_headers(false)
      .flexible(true)
      .trim(csv::Trim::All)
      .from_reader(reader);

    let mut by_id = HashMap::new();
    for record in csv.records() {
      let record = record?;
      let line = record.position().map(|p| p.line()).unwrap_or_default();
      let field = |idx: usize, name: &'static str| {
        record
          .get(idx)
          .filter(|v| !v.is_empty())
          .map(str::to_owned)
          .ok_or(PromoterError::MissingField { line, field: name })
      };

      let org = PromoterOrg {
        id:      field(0, "id")?,
        name:    field(1, "name")?,
        url:     field(2, "url")?,
        favicon: field(3, "favicon").ok(),
      };
      if by_id.contains_key(&org.id) {
        return Err(PromoterError::Duplicate(org.id));
      }
      by_id.insert(org.id.clone(), org);
    }
    Ok(Self { by_id })
  }

  /// Load from `path`, or an empty directory when no file is configured.
  pub fn load(path: Option<&Path>) -> Result<Self, PromoterError> {
    let Some(path) = path else {
      return Ok(Self::default());
    };
    let directory = Self::from_reader(std::fs::File::open(path).map_err(csv::Error::from)?)?;
    info!(path = %path.display(), promoters = directory.len(), "promoter directory loaded");
    Ok(directory)
  }

  pub fn get(&self, id: &str) -> Option<&PromoterOrg> { self.by_id.get(id) }

  pub fn len(&self) -> usize { self.by_id.len() }

  pub fn is_empty(&self) -> bool { self.by_id.is_empty() }

  pub fn enrich(&self, event: Event) -> EnrichedEvent {
    let org = event.promoter_swa_code.as_deref().and_then(|id| self.get(id));
    EnrichedEvent {
      promoter_website_url: org.map(|o| o.url.clone()),
      promoter_logo_url:    org.and_then(|o| o.favicon.clone()),
      event,
    }
  }
}
