//! CSV loading for historical register snapshots.
//!
//! The register used to be published as dated CSV downloads; importing them
//! chronologically rebuilds the version history from before harvesting
//! started. Columns are taken as-is into the raw field map, so the import
//! path and the harvest path feed the tidying pipeline identically.

use std::{fs::File, io::Read, path::Path};

use anyhow::{Context as _, Result};
use relic_core::raw::RawRecord;
use tracing::warn;

/// Header variants naming the asset id across the published downloads.
const ID_COLUMNS: [&str; 2] = ["uniqueID", "unique_id"];

/// Load one historical CSV snapshot into raw records.
pub fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
  let file =
    File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
  parse_csv(file)
}

/// Parse CSV content into raw records. Rows without an asset id and rows
/// the CSV reader cannot decode are skipped with a warning; one bad row
/// never aborts the import.
pub fn parse_csv(input: impl Read) -> Result<Vec<RawRecord>> {
  let mut reader = csv::Reader::from_reader(input);
  let headers = reader.headers().context("reading csv headers")?.clone();

  let mut records = Vec::new();
  for (index, row) in reader.records().enumerate() {
    // Header row is line 1, so data rows start at line 2.
    let line = index + 2;
    let row = match row {
      Ok(row) => row,
      Err(e) => {
        warn!(line, error = %e, "skipping unreadable csv row");
        continue;
      }
    };

    let mut record = RawRecord::new("");
    for (header, value) in headers.iter().zip(row.iter()) {
      record.set(header, value);
    }

    let asset_id = ID_COLUMNS
      .iter()
      .find_map(|col| record.get(col).and_then(|v| v.as_str()))
      .map(str::trim)
      .unwrap_or_default()
      .to_string();

    if asset_id.is_empty() {
      warn!(line, "skipping csv row without an asset id");
      continue;
    }

    record.asset_id = asset_id;
    records.push(record);
  }

  Ok(records)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
