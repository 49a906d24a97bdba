//! Rate-limited, retrying HTTP fetcher.
//!
//! Every request is preceded by the configured rate-limit delay so the
//! register is never hammered, retries included. Failures are retried with
//! a linearly growing pause; after the last attempt the caller gets a typed
//! error and the shared error counter is bumped. A fetch failure is never
//! fatal to the surrounding batch.

use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use tracing::warn;

use crate::{Error, HarvestConfig, Result};

pub struct Fetcher {
  client:        reqwest::Client,
  request_delay: Duration,
  max_retries:   u32,
  errors:        AtomicU64,
}

impl Fetcher {
  pub fn new(config: &HarvestConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self {
      client,
      request_delay: Duration::from_millis(config.request_delay_ms),
      max_retries: config.max_retries,
      errors: AtomicU64::new(0),
    })
  }

  /// Fetch `url`, retrying on non-success status or transport errors.
  pub async fn get(&self, url: &str) -> Result<String> {
    for attempt in 1..=self.max_retries {
      tokio::time::sleep(self.request_delay).await;

      match self.client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
          match response.text().await {
            Ok(body) => return Ok(body),
            Err(e) => warn!(url, attempt, error = %e, "failed reading body"),
          }
        }
        Ok(response) => {
          warn!(url, attempt, status = %response.status(), "non-success response");
        }
        Err(e) => {
          warn!(url, attempt, error = %e, "request failed");
        }
      }

      if attempt < self.max_retries {
        tokio::time::sleep(self.request_delay * attempt).await;
      }
    }

    self.errors.fetch_add(1, Ordering::Relaxed);
    Err(Error::RetriesExhausted {
      url:      url.to_string(),
      attempts: self.max_retries,
    })
  }

  /// Total number of URLs whose retries were exhausted.
  pub fn error_count(&self) -> u64 {
    self.errors.load(Ordering::Relaxed)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
