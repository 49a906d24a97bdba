//! Batch orchestration: listing fetch, bounded detail fan-out, and the
//! full / incremental harvest modes.

use std::{
  collections::{HashMap, HashSet},
  time::Duration,
};

use chrono::{Days, NaiveDate};
use futures::{StreamExt as _, stream};
use relic_core::{raw::RawRecord, store::AssetStore};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
  fetch::Fetcher,
  parse::{AssetDetails, AssetSummary, parse_details, parse_summaries},
  HarvestConfig, HarvestError, Result,
};

/// Log incremental progress every this many stored records.
const PROGRESS_EVERY: usize = 100;

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a full harvest: the assembled batch plus the error tally.
/// Partial results are expected; a failed detail fetch leaves a record with
/// only its summary fields.
#[derive(Debug)]
pub struct FullHarvest {
  pub records: Vec<RawRecord>,
  pub errors:  u64,
}

/// Result of an incremental harvest. Records were persisted one by one as
/// they arrived, so an interrupted run keeps everything already stored.
#[derive(Debug)]
pub struct IncrementalHarvest {
  /// Assets that needed a refresh after applying the exclusion set.
  pub candidates: usize,
  pub stored:     usize,
  pub errors:     u64,
}

// ─── Harvester ───────────────────────────────────────────────────────────────

pub struct Harvester {
  config:       HarvestConfig,
  fetcher:      Fetcher,
  detail_delay: Duration,
}

impl Harvester {
  pub fn new(config: HarvestConfig) -> Result<Self> {
    let fetcher = Fetcher::new(&config)?;
    let detail_delay = Duration::from_millis(config.detail_delay_ms);
    Ok(Self { config, fetcher, detail_delay })
  }

  // ── Single fetches ────────────────────────────────────────────────────────

  /// Fetch and parse the listing page.
  pub async fn fetch_summaries(&self) -> Result<Vec<AssetSummary>> {
    let body = self.fetcher.get(&self.config.summary_url).await?;
    let summaries = parse_summaries(&body);
    info!(count = summaries.len(), "parsed register listing");
    Ok(summaries)
  }

  /// Fetch and parse one detail page. `None` on failure; the error has
  /// already been tallied, and one asset's failure never affects another.
  pub async fn fetch_details(&self, asset_id: &str) -> Option<AssetDetails> {
    tokio::time::sleep(self.detail_delay).await;

    let url = self.config.detail_url(asset_id);
    match self.fetcher.get(&url).await {
      Ok(body) => Some(parse_details(asset_id, &body)),
      Err(e) => {
        warn!(asset_id, error = %e, "detail fetch failed");
        None
      }
    }
  }

  // ── Full harvest ──────────────────────────────────────────────────────────

  /// Harvest the whole register into one in-memory batch: the listing page,
  /// then every detail page through a bounded worker pool.
  pub async fn harvest_full(&self) -> Result<FullHarvest> {
    let summaries = self.fetch_summaries().await?;

    info!(assets = summaries.len(), "fetching detail pages");
    let details: HashMap<String, AssetDetails> =
      stream::iter(summaries.iter().map(|summary| async move {
        let details = self.fetch_details(&summary.asset_id).await;
        (summary.asset_id.clone(), details)
      }))
      .buffer_unordered(self.config.max_concurrency)
      .filter_map(|(asset_id, details)| async move {
        details.map(|d| (asset_id, d))
      })
      .collect()
      .await;

    let records = summaries
      .iter()
      .map(|summary| raw_record(summary, details.get(&summary.asset_id)))
      .collect();

    let errors = self.fetcher.error_count();
    info!(fetched = details.len(), errors, "full harvest complete");
    Ok(FullHarvest { records, errors })
  }

  // ── Incremental harvest ───────────────────────────────────────────────────

  /// Harvest only assets without a raw record in the last `skip_days` days,
  /// persisting each successful record immediately so an interruption loses
  /// at most the fetches in flight.
  pub async fn harvest_incremental<S: AssetStore>(
    &self,
    store: &S,
    snapshot_date: NaiveDate,
    skip_days: u64,
    limit: Option<usize>,
  ) -> std::result::Result<IncrementalHarvest, HarvestError<S::Error>> {
    let summaries = self.fetch_summaries().await?;

    let cutoff = snapshot_date
      .checked_sub_days(Days::new(skip_days))
      .unwrap_or(NaiveDate::MIN);
    let recent = store
      .harvested_since(cutoff)
      .await
      .map_err(HarvestError::Store)?;

    let mut to_fetch = pending(&summaries, &recent);
    info!(
      listed = summaries.len(),
      recently_harvested = recent.len(),
      pending = to_fetch.len(),
      "incremental harvest plan"
    );
    if let Some(limit) = limit {
      to_fetch.truncate(limit);
    }
    let candidates = to_fetch.len();

    let mut results = stream::iter(to_fetch.into_iter().map(|summary| async move {
      let details = self.fetch_details(&summary.asset_id).await;
      (summary, details)
    }))
    .buffer_unordered(self.config.max_concurrency);

    let mut stored = 0;
    while let Some((summary, details)) = results.next().await {
      let Some(details) = details else { continue };

      let record = raw_record(summary, Some(&details));
      stored += store
        .append_raw(snapshot_date, vec![record])
        .await
        .map_err(HarvestError::Store)?;

      if stored > 0 && stored % PROGRESS_EVERY == 0 {
        info!(stored, candidates, "incremental harvest progress");
      }
    }

    let errors = self.fetcher.error_count();
    info!(stored, candidates, errors, "incremental harvest complete");
    Ok(IncrementalHarvest { candidates, stored, errors })
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Summaries still needing a refresh after removing recently harvested ids.
pub fn pending<'a>(
  summaries: &'a [AssetSummary],
  recent: &HashSet<String>,
) -> Vec<&'a AssetSummary> {
  summaries
    .iter()
    .filter(|s| !recent.contains(&s.asset_id))
    .collect()
}

/// Merge a listing summary and its (possibly missing) detail page into one
/// raw record, keyed the way the register names its fields.
pub fn raw_record(summary: &AssetSummary, details: Option<&AssetDetails>) -> RawRecord {
  let detail_field = |f: fn(&AssetDetails) -> &String| -> Value {
    match details {
      Some(d) => Value::from(f(d).as_str()),
      None => Value::Null,
    }
  };

  RawRecord::new(&summary.asset_id)
    .with_field("description", summary.description.as_str())
    .with_field("location", summary.location.as_str())
    .with_field("category", summary.category.as_str())
    .with_field("owner_id", detail_field(|d| &d.owner_id))
    .with_field("access_details", detail_field(|d| &d.access_details))
    .with_field("contact_name", detail_field(|d| &d.contact_name))
    .with_field("contact_address", detail_field(|d| &d.contact_address))
    .with_field("contact_reference", detail_field(|d| &d.contact_reference))
    .with_field("telephone_no", detail_field(|d| &d.telephone_no))
    .with_field("fax_no", detail_field(|d| &d.fax_no))
    .with_field("email", detail_field(|d| &d.email))
    .with_field("website", detail_field(|d| &d.website))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use relic_core::tidy::tidy;

  use super::*;

  fn summary(id: &str) -> AssetSummary {
    AssetSummary {
      asset_id:    id.to_string(),
      description: "Bell".into(),
      location:    "York".into(),
      category:    "Artefact".into(),
    }
  }

  #[test]
  fn pending_filters_recent_ids() {
    let summaries = vec![summary("1"), summary("2"), summary("3")];
    let recent: HashSet<String> = ["2".to_string()].into();

    let left = pending(&summaries, &recent);
    let ids: Vec<&str> = left.iter().map(|s| s.asset_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
  }

  #[test]
  fn raw_record_merges_summary_and_details() {
    let details = AssetDetails {
      asset_id: "1".into(),
      owner_id: "271".into(),
      contact_name: "Estate Office".into(),
      ..Default::default()
    };

    let record = raw_record(&summary("1"), Some(&details));
    assert_eq!(record.asset_id, "1");
    assert_eq!(record.get("description").and_then(|v| v.as_str()), Some("Bell"));
    assert_eq!(record.get("owner_id").and_then(|v| v.as_str()), Some("271"));
    assert_eq!(
      record.get("contact_name").and_then(|v| v.as_str()),
      Some("Estate Office")
    );
  }

  #[test]
  fn detail_less_record_keeps_summary_fields_only() {
    let record = raw_record(&summary("1"), None);
    assert_eq!(record.get("category").and_then(|v| v.as_str()), Some("Artefact"));
    assert!(record.get("owner_id").unwrap().is_null());

    // Tidying a detail-less record must still produce a usable asset.
    let tidied = tidy(&record);
    assert_eq!(tidied.asset_id, "1");
    assert_eq!(tidied.description, "Bell");
    assert!(tidied.owner_id.is_none());
  }
}
