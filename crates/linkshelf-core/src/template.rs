//! Profile templates: a read-only catalog fetched in bulk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
  pub id:            String,
  pub name:          String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub background:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail_url: Option<String>,
  #[serde(flatten)]
  pub extra:         Map<String, Value>,
}
