//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Dates are stored as ISO 8601 strings. Changed-field lists are stored as
//! compact JSON arrays. The raw field map is stored as one JSON object.

use chrono::NaiveDate;
use relic_core::{
  asset::{AssetVersion, TidiedAsset, TidiedContact},
  change::{ChangeEvent, SnapshotSource},
};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse()
    .map_err(|_| Error::DateParse(format!("invalid date: {s:?}")))
}

// ─── SnapshotSource ──────────────────────────────────────────────────────────

pub fn encode_source(source: SnapshotSource) -> &'static str {
  source.as_str()
}

// ─── Change events ───────────────────────────────────────────────────────────

/// Column values for one `change_events` insert.
pub struct EventRow {
  pub asset_id:       String,
  pub change_type:    &'static str,
  pub change_date:    String,
  pub changed_fields: String,
  pub summary:        String,
}

impl EventRow {
  pub fn from_event(event: &ChangeEvent) -> Result<Self> {
    Ok(Self {
      asset_id:       event.asset_id.clone(),
      change_type:    event.kind.as_str(),
      change_date:    encode_date(event.change_date),
      changed_fields: serde_json::to_string(&event.changed_fields)?,
      summary:        event.summary.clone(),
    })
  }
}

// ─── Version rows ────────────────────────────────────────────────────────────

/// The flattened column form of an [`AssetVersion`], used both for inserts
/// and for decoding query results.
pub struct VersionRow {
  pub asset_id:         String,
  pub owner_id:         Option<String>,
  pub description:      String,
  pub location:         String,
  pub category:         String,
  pub access_details:   Option<String>,
  pub contact_name:     Option<String>,
  pub address_line1:    Option<String>,
  pub address_line2:    Option<String>,
  pub address_city:     Option<String>,
  pub address_postcode: Option<String>,
  pub telephone:        Option<String>,
  pub fax:              Option<String>,
  pub email:            Option<String>,
  pub website:          Option<String>,
  pub valid_from:       String,
  pub valid_until:      Option<String>,
}

impl VersionRow {
  pub fn from_version(version: &AssetVersion) -> Self {
    let asset = &version.asset;
    let contact = &asset.contact;
    Self {
      asset_id:         asset.asset_id.clone(),
      owner_id:         asset.owner_id.clone(),
      description:      asset.description.clone(),
      location:         asset.location.clone(),
      category:         asset.category.clone(),
      access_details:   asset.access_details.clone(),
      contact_name:     contact.name.clone(),
      address_line1:    contact.line1.clone(),
      address_line2:    contact.line2.clone(),
      address_city:     contact.city.clone(),
      address_postcode: contact.postcode.clone(),
      telephone:        contact.telephone.clone(),
      fax:              contact.fax.clone(),
      email:            contact.email.clone(),
      website:          contact.website.clone(),
      valid_from:       encode_date(version.valid_from),
      valid_until:      version.valid_until.map(encode_date),
    }
  }

  pub fn into_version(self) -> Result<AssetVersion> {
    Ok(AssetVersion {
      asset: TidiedAsset {
        asset_id:       self.asset_id,
        owner_id:       self.owner_id,
        description:    self.description,
        location:       self.location,
        category:       self.category,
        access_details: self.access_details,
        contact: TidiedContact {
          name:      self.contact_name,
          line1:     self.address_line1,
          line2:     self.address_line2,
          city:      self.address_city,
          postcode:  self.address_postcode,
          telephone: self.telephone,
          fax:       self.fax,
          email:     self.email,
          website:   self.website,
        },
      },
      valid_from:  decode_date(&self.valid_from)?,
      valid_until: self.valid_until.as_deref().map(decode_date).transpose()?,
    })
  }
}

/// The column list shared by version SELECTs; keep in sync with
/// [`VersionRow`] field order.
pub const VERSION_COLUMNS: &str = "
  asset_id, owner_id, description, location, category, access_details,
  contact_name, address_line1, address_line2, address_city, address_postcode,
  telephone, fax, email, website, valid_from, valid_until";

/// Map one row of [`VERSION_COLUMNS`] into a [`VersionRow`].
pub fn version_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionRow> {
  Ok(VersionRow {
    asset_id:         row.get(0)?,
    owner_id:         row.get(1)?,
    description:      row.get(2)?,
    location:         row.get(3)?,
    category:         row.get(4)?,
    access_details:   row.get(5)?,
    contact_name:     row.get(6)?,
    address_line1:    row.get(7)?,
    address_line2:    row.get(8)?,
    address_city:     row.get(9)?,
    address_postcode: row.get(10)?,
    telephone:        row.get(11)?,
    fax:              row.get(12)?,
    email:            row.get(13)?,
    website:          row.get(14)?,
    valid_from:       row.get(15)?,
    valid_until:      row.get(16)?,
  })
}
