//! Raw snapshot records — the register data exactly as harvested.
//!
//! The remote source's field set is treated as schema-on-read: a record is a
//! bag of named JSON scalars keyed by `(snapshot_date, asset_id)`. Unknown
//! keys are preserved verbatim so the raw layer stays a faithful audit copy
//! regardless of what the tidying pipeline currently understands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One asset as harvested at one snapshot date. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
  pub asset_id: String,
  pub fields:   serde_json::Map<String, Value>,
}

impl RawRecord {
  pub fn new(asset_id: impl Into<String>) -> Self {
    Self {
      asset_id: asset_id.into(),
      fields:   serde_json::Map::new(),
    }
  }

  /// Builder-style field setter; convenient for harvesting and tests.
  pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.set(key, value);
    self
  }

  pub fn set(&mut self, key: &str, value: impl Into<Value>) {
    self.fields.insert(key.to_string(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.fields.get(key)
  }
}
