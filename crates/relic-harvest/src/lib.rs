//! Harvesting of the remote heritage register.
//!
//! The register is slow and not entirely reliable, so everything here is
//! built around partial success: the [`fetch::Fetcher`] retries with
//! backoff and rate-limits itself, the [`parse`] module skips malformed
//! rows one at a time, and the [`harvester::Harvester`] collects whatever
//! detail pages it can get while tallying what it could not.

pub mod error;
pub mod fetch;
pub mod harvester;
pub mod parse;

pub use error::{Error, HarvestError, Result};
pub use harvester::Harvester;

use serde::Deserialize;

/// Harvester settings, deserialised from the application config file.
///
/// The defaults match the register's published tolerance: one detail page
/// every half second, five fetches in flight at once.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
  /// The full-register listing query.
  pub summary_url:         String,
  /// Detail page URL with an `{id}` placeholder.
  pub detail_url_template: String,
  /// Rate-limit delay applied before every request, in milliseconds.
  pub request_delay_ms:    u64,
  /// Additional delay before each detail-page fetch, in milliseconds.
  pub detail_delay_ms:     u64,
  pub timeout_secs:        u64,
  pub max_retries:         u32,
  pub max_concurrency:     usize,
}

impl Default for HarvestConfig {
  fn default() -> Self {
    Self {
      summary_url: "http://www.visitukheritage.gov.uk/servlet/\
                    com.eds.ir.cto.servlet.CtoDbQueryServlet?\
                    location=All&class1=All&freetext=&Submit=search"
        .to_string(),
      detail_url_template: "http://www.visitukheritage.gov.uk/servlet/\
                            com.eds.ir.cto.servlet.CtoDetailServlet?ID={id}"
        .to_string(),
      request_delay_ms: 100,
      detail_delay_ms: 500,
      timeout_secs: 30,
      max_retries: 3,
      max_concurrency: 5,
    }
  }
}

impl HarvestConfig {
  pub fn detail_url(&self, asset_id: &str) -> String {
    self.detail_url_template.replace("{id}", asset_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detail_url_substitutes_the_id() {
    let config = HarvestConfig {
      detail_url_template: "http://example.org/detail?ID={id}".into(),
      ..Default::default()
    };
    assert_eq!(
      config.detail_url("12345"),
      "http://example.org/detail?ID=12345"
    );
  }

  #[test]
  fn defaults_match_register_tolerance() {
    let config = HarvestConfig::default();
    assert_eq!(config.max_concurrency, 5);
    assert_eq!(config.detail_delay_ms, 500);
    assert_eq!(config.max_retries, 3);
  }
}
