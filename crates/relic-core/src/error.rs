//! Error types for `relic-core`.

use chrono::NaiveDate;
use thiserror::Error;

/// Pass-level failures. Per-item problems (a malformed row, a failed fetch)
/// never surface here; they are logged and tallied by the harvester.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  /// The incoming batch had no usable records. Almost always an upstream
  /// harvest failure, so it must not be interpreted as mass removal.
  #[error("snapshot {0} has no usable records; refusing to reconcile")]
  EmptyBatch(NaiveDate),

  /// A snapshot run already exists for this date.
  #[error("snapshot {0} has already been processed")]
  SnapshotAlreadyProcessed(NaiveDate),

  /// Data-integrity violation: reconciliation found two open versions for
  /// the same asset. Never repaired silently.
  #[error("asset {0} has more than one live version")]
  MultipleLiveVersions(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error from a full reconciliation pass driven against a store backend.
#[derive(Debug, Error)]
pub enum PassError<E: std::error::Error> {
  #[error(transparent)]
  Reconcile(#[from] Error),

  #[error("store error: {0}")]
  Store(E),
}
