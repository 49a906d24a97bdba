//! Error types for `relic-harvest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Every retry for one URL failed. Reported per item; the surrounding
  /// batch keeps going.
  #[error("request to {url} failed after {attempts} attempts")]
  RetriesExhausted { url: String, attempts: u32 },

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error from a harvest run that also talks to a store backend.
#[derive(Debug, Error)]
pub enum HarvestError<E: std::error::Error> {
  #[error(transparent)]
  Fetch(#[from] Error),

  #[error("store error: {0}")]
  Store(E),
}
