use serde::{Deserialize, Serialize};

/// A works promoter (utility company, contractor or authority). `id` is the
/// promoter's SWA code as it appears in `Event::promoter_swa_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoterOrg {
  pub id:      String,
  pub name:    String,
  pub url:     String,
  #[serde(default)]
  pub favicon: Option<String>,
}
