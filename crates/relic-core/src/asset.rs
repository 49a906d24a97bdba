//! Tidied asset records and their versioned (SCD Type 2) form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalised contact details for an asset's custodian.
///
/// Every field is optional; the tidying pipeline never stores an empty
/// string, so `None` always means "the source had nothing usable".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidiedContact {
  pub name:      Option<String>,
  pub line1:     Option<String>,
  pub line2:     Option<String>,
  pub city:      Option<String>,
  pub postcode:  Option<String>,
  pub telephone: Option<String>,
  pub fax:       Option<String>,
  pub email:     Option<String>,
  pub website:   Option<String>,
}

/// The canonical, normalised form of one register entry.
///
/// `description`, `location` and `category` default to the empty string when
/// the source omits them, so downstream comparisons never have to reason
/// about null-vs-missing for the identity-adjacent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidiedAsset {
  pub asset_id:       String,
  pub owner_id:       Option<String>,
  pub description:    String,
  pub location:       String,
  pub category:       String,
  pub access_details: Option<String>,
  pub contact:        TidiedContact,
}

impl TidiedAsset {
  /// Open a new version of this asset, live as of `valid_from`.
  pub fn into_version(self, valid_from: NaiveDate) -> AssetVersion {
    AssetVersion {
      asset: self,
      valid_from,
      valid_until: None,
    }
  }
}

/// One historical state of an asset.
///
/// The interval `[valid_from, valid_until)` is half-open; `valid_until` of
/// `None` marks the live version. For a given asset there is at most one
/// live version and the closed intervals never overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVersion {
  pub asset:       TidiedAsset,
  pub valid_from:  NaiveDate,
  pub valid_until: Option<NaiveDate>,
}

impl AssetVersion {
  pub fn is_live(&self) -> bool {
    self.valid_until.is_none()
  }

  /// Whether this version was the current one on `date`.
  pub fn was_valid_on(&self, date: NaiveDate) -> bool {
    self.valid_from <= date && self.valid_until.is_none_or(|until| until > date)
  }
}
