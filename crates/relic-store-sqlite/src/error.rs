//! Error type for `relic-store-sqlite`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// The commit transaction found an existing run for the snapshot date.
  #[error("snapshot {0} has already been processed")]
  SnapshotAlreadyProcessed(NaiveDate),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
