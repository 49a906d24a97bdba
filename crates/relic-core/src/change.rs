//! Change log and snapshot-run metadata.
//!
//! `ChangeEvent` rows are the human-readable "what changed when" feed; they
//! are append-only and never mutated. `SnapshotRun` records one
//! reconciliation pass per date and doubles as the idempotency guard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Change events ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
  Added,
  Updated,
  Removed,
}

impl ChangeKind {
  /// The discriminant string stored in the `change_type` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Added => "added",
      Self::Updated => "updated",
      Self::Removed => "removed",
    }
  }
}

/// An append-only log entry describing one asset transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub asset_id:       String,
  pub kind:           ChangeKind,
  pub change_date:    NaiveDate,
  /// Names of the fields that differed; empty for additions and removals.
  pub changed_fields: Vec<String>,
  pub summary:        String,
}

// ─── Snapshot runs ───────────────────────────────────────────────────────────

/// Where a snapshot batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
  Harvest,
  Import,
}

impl SnapshotSource {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Harvest => "harvest",
      Self::Import => "import",
    }
  }
}

/// Metadata for one reconciliation pass. Unique per `snapshot_date`; a date
/// with an existing run must never be reprocessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRun {
  pub snapshot_date: NaiveDate,
  pub source:        SnapshotSource,
  /// Set for CSV imports; `None` for harvested batches.
  pub source_file:   Option<String>,
  pub record_count:  usize,
  pub added:         usize,
  pub updated:       usize,
  pub removed:       usize,
}

/// Counts returned to the caller of a pass. `unchanged` is informational
/// only and is not persisted with the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassResult {
  pub added:     usize,
  pub updated:   usize,
  pub removed:   usize,
  pub unchanged: usize,
}
