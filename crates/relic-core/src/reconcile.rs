//! The SCD Type 2 reconciliation engine.
//!
//! [`plan`] is the pure heart: given the live version set and a tidied
//! batch, it computes every transition for one snapshot date against a
//! single consistent view of the live state. Nothing is mutated while
//! planning; the resulting [`ReconcilePlan`] is applied in one atomic
//! commit by the store. [`run_pass`] is the async driver that wires the
//! two together for callers holding a raw batch.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
  asset::{AssetVersion, TidiedAsset},
  change::{ChangeEvent, ChangeKind, PassResult, SnapshotRun, SnapshotSource},
  diff::diff,
  error::{Error, PassError, Result},
  raw::RawRecord,
  store::AssetStore,
  tidy::tidy,
};

/// Change-event summaries truncate long descriptions to this many chars.
const SUMMARY_LEN: usize = 100;

/// At most this many field names are spelled out in an update summary.
const SUMMARY_FIELDS: usize = 5;

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Everything one pass will write, computed up front.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
  pub snapshot_date: NaiveDate,
  /// Versions opened at `snapshot_date` (additions plus updated assets).
  pub new_versions:  Vec<AssetVersion>,
  /// Asset ids whose live version closes at `snapshot_date`.
  pub close_ids:     Vec<String>,
  pub events:        Vec<ChangeEvent>,
  pub result:        PassResult,
}

/// Compute the transitions for one snapshot date.
///
/// `live` must be the complete live version set at the start of the pass;
/// `batch` is the tidied snapshot. Records with a blank asset id are
/// dropped; if nothing usable remains the batch is rejected as a harvest
/// failure rather than interpreted as mass removal.
pub fn plan(
  live: &[AssetVersion],
  batch: &[TidiedAsset],
  snapshot_date: NaiveDate,
) -> Result<ReconcilePlan> {
  let mut current: BTreeMap<&str, &AssetVersion> = BTreeMap::new();
  for version in live {
    if current.insert(version.asset.asset_id.as_str(), version).is_some() {
      return Err(Error::MultipleLiveVersions(version.asset.asset_id.clone()));
    }
  }

  // Last record wins when a batch repeats an id, matching raw-layer
  // uniqueness on (date, asset_id).
  let mut incoming: BTreeMap<&str, &TidiedAsset> = BTreeMap::new();
  for asset in batch {
    if !asset.asset_id.is_empty() {
      incoming.insert(asset.asset_id.as_str(), asset);
    }
  }

  if incoming.is_empty() {
    return Err(Error::EmptyBatch(snapshot_date));
  }

  let mut out = ReconcilePlan {
    snapshot_date,
    new_versions: Vec::new(),
    close_ids: Vec::new(),
    events: Vec::new(),
    result: PassResult::default(),
  };

  // Additions: in the batch, no live version.
  for (id, asset) in &incoming {
    if current.contains_key(id) {
      continue;
    }
    out.new_versions.push((*asset).clone().into_version(snapshot_date));
    out.events.push(ChangeEvent {
      asset_id: (*id).to_string(),
      kind: ChangeKind::Added,
      change_date: snapshot_date,
      changed_fields: Vec::new(),
      summary: format!("Asset added: {}", truncated(&asset.description)),
    });
    out.result.added += 1;
  }

  // Removals: live version, missing from the batch.
  for (id, version) in &current {
    if incoming.contains_key(id) {
      continue;
    }
    out.close_ids.push((*id).to_string());
    out.events.push(ChangeEvent {
      asset_id: (*id).to_string(),
      kind: ChangeKind::Removed,
      change_date: snapshot_date,
      changed_fields: Vec::new(),
      summary: format!("Asset removed: {}", truncated(&version.asset.description)),
    });
    out.result.removed += 1;
  }

  // Updates: present in both; only a non-empty diff creates a version.
  for (id, asset) in &incoming {
    let Some(old) = current.get(id) else {
      continue;
    };

    let changed = diff(&old.asset, *asset);
    if changed.is_empty() {
      out.result.unchanged += 1;
      continue;
    }

    out.close_ids.push((*id).to_string());
    out.new_versions.push((*asset).clone().into_version(snapshot_date));
    out.events.push(ChangeEvent {
      asset_id: (*id).to_string(),
      kind: ChangeKind::Updated,
      change_date: snapshot_date,
      changed_fields: changed.iter().map(|f| f.to_string()).collect(),
      summary: format!(
        "Fields changed: {}",
        changed
          .iter()
          .take(SUMMARY_FIELDS)
          .copied()
          .collect::<Vec<_>>()
          .join(", ")
      ),
    });
    out.result.updated += 1;
  }

  Ok(out)
}

fn truncated(text: &str) -> String {
  if text.chars().count() <= SUMMARY_LEN {
    text.to_string()
  } else {
    let cut: String = text.chars().take(SUMMARY_LEN).collect();
    format!("{cut}...")
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// Run one complete reconciliation pass against `store`.
///
/// Fails fast if `snapshot_date` already has a recorded run; the store
/// re-checks that key inside the commit transaction, so two racing passes
/// for the same date cannot both land.
pub async fn run_pass<S: AssetStore>(
  store: &S,
  snapshot_date: NaiveDate,
  source: SnapshotSource,
  source_file: Option<String>,
  raw: &[RawRecord],
) -> std::result::Result<PassResult, PassError<S::Error>> {
  if store
    .has_snapshot_run(snapshot_date)
    .await
    .map_err(PassError::Store)?
  {
    return Err(Error::SnapshotAlreadyProcessed(snapshot_date).into());
  }

  if raw.is_empty() {
    return Err(Error::EmptyBatch(snapshot_date).into());
  }

  let batch: Vec<TidiedAsset> = raw.iter().map(tidy).collect();
  let live = store.live_versions().await.map_err(PassError::Store)?;

  let plan = plan(&live, &batch, snapshot_date)?;
  let result = plan.result;

  let run = SnapshotRun {
    snapshot_date,
    source,
    source_file,
    record_count: raw.len(),
    added: result.added,
    updated: result.updated,
    removed: result.removed,
  };

  store.commit_pass(plan, run).await.map_err(PassError::Store)?;
  Ok(result)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
  }

  fn asset(id: &str, category: &str) -> TidiedAsset {
    TidiedAsset {
      asset_id: id.into(),
      description: "Bell".into(),
      location: "York".into(),
      category: category.into(),
      ..Default::default()
    }
  }

  #[test]
  fn addition_opens_a_live_version() {
    let batch = vec![asset("A1", "Artefact")];
    let plan = plan(&[], &batch, date("2024-03-02")).unwrap();

    assert_eq!(plan.result, PassResult { added: 1, ..Default::default() });
    assert_eq!(plan.new_versions.len(), 1);
    assert_eq!(plan.new_versions[0].asset.asset_id, "A1");
    assert_eq!(plan.new_versions[0].valid_from, date("2024-03-02"));
    assert!(plan.new_versions[0].is_live());
    assert!(plan.close_ids.is_empty());

    assert_eq!(plan.events.len(), 1);
    assert_eq!(plan.events[0].kind, ChangeKind::Added);
    assert!(plan.events[0].changed_fields.is_empty());
  }

  #[test]
  fn update_closes_old_and_opens_new() {
    let live = vec![asset("A1", "Artefact").into_version(date("2023-01-25"))];
    let batch = vec![asset("A1", "Relic")];
    let plan = plan(&live, &batch, date("2024-03-02")).unwrap();

    assert_eq!(plan.result, PassResult { updated: 1, ..Default::default() });
    assert_eq!(plan.close_ids, vec!["A1"]);
    assert_eq!(plan.new_versions.len(), 1);
    assert_eq!(plan.new_versions[0].asset.category, "Relic");
    assert_eq!(plan.new_versions[0].valid_from, date("2024-03-02"));

    assert_eq!(plan.events[0].kind, ChangeKind::Updated);
    assert_eq!(plan.events[0].changed_fields, vec!["category"]);
  }

  #[test]
  fn removal_closes_without_replacement() {
    let live = vec![
      asset("A1", "Artefact").into_version(date("2023-01-25")),
      asset("B2", "Artefact").into_version(date("2023-01-25")),
    ];
    let batch = vec![asset("B2", "Artefact")];
    let plan = plan(&live, &batch, date("2024-03-02")).unwrap();

    assert_eq!(
      plan.result,
      PassResult { removed: 1, unchanged: 1, ..Default::default() }
    );
    assert_eq!(plan.close_ids, vec!["A1"]);
    assert!(plan.new_versions.is_empty());
    assert_eq!(plan.events.len(), 1);
    assert_eq!(plan.events[0].kind, ChangeKind::Removed);
  }

  #[test]
  fn unchanged_assets_produce_no_versions_or_events() {
    let live = vec![asset("A1", "Artefact").into_version(date("2023-01-25"))];
    let batch = vec![asset("A1", "Artefact")];
    let plan = plan(&live, &batch, date("2024-03-02")).unwrap();

    assert_eq!(plan.result, PassResult { unchanged: 1, ..Default::default() });
    assert!(plan.new_versions.is_empty());
    assert!(plan.close_ids.is_empty());
    assert!(plan.events.is_empty());
  }

  #[test]
  fn empty_batch_is_rejected() {
    let live = vec![asset("A1", "Artefact").into_version(date("2023-01-25"))];
    let err = plan(&live, &[], date("2024-03-02")).unwrap_err();
    assert_eq!(err, Error::EmptyBatch(date("2024-03-02")));
  }

  #[test]
  fn batch_of_blank_ids_counts_as_empty() {
    let batch = vec![asset("", "Artefact")];
    let err = plan(&[], &batch, date("2024-03-02")).unwrap_err();
    assert_eq!(err, Error::EmptyBatch(date("2024-03-02")));
  }

  #[test]
  fn duplicate_live_versions_are_fatal() {
    let live = vec![
      asset("A1", "Artefact").into_version(date("2023-01-25")),
      asset("A1", "Relic").into_version(date("2023-09-30")),
    ];
    let batch = vec![asset("A1", "Relic")];
    let err = plan(&live, &batch, date("2024-03-02")).unwrap_err();
    assert_eq!(err, Error::MultipleLiveVersions("A1".into()));
  }

  #[test]
  fn replanning_the_result_is_a_no_op() {
    // Apply a first plan by hand, then plan the same batch again: the
    // second pass must find nothing to do.
    let live = vec![asset("A1", "Artefact").into_version(date("2023-01-25"))];
    let batch = vec![asset("A1", "Relic"), asset("B2", "Artefact")];

    let first = plan(&live, &batch, date("2023-09-30")).unwrap();
    assert_eq!(first.result.added, 1);
    assert_eq!(first.result.updated, 1);

    let mut next_live: Vec<AssetVersion> = live
      .into_iter()
      .filter(|v| !first.close_ids.contains(&v.asset.asset_id))
      .collect();
    next_live.extend(first.new_versions.clone());

    let second = plan(&next_live, &batch, date("2024-03-02")).unwrap();
    assert_eq!(
      second.result,
      PassResult { unchanged: 2, ..Default::default() }
    );
    assert!(second.new_versions.is_empty());
    assert!(second.close_ids.is_empty());
    assert!(second.events.is_empty());
  }

  #[test]
  fn update_summary_lists_at_most_five_fields() {
    let live = vec![asset("A1", "Artefact").into_version(date("2023-01-25"))];
    let mut changed = asset("A1", "Relic");
    changed.owner_id = Some("271".into());
    changed.description = "Bronze bell".into();
    changed.location = "Leeds".into();
    changed.access_details = Some("By appointment".into());
    changed.contact.email = Some("office@example.org".into());

    let plan = plan(&live, &[changed], date("2024-03-02")).unwrap();
    assert_eq!(plan.events[0].changed_fields.len(), 6);
    assert_eq!(
      plan.events[0].summary,
      "Fields changed: owner_id, description, location, category, access_details"
    );
  }

  #[test]
  fn long_descriptions_are_truncated_in_summaries() {
    let mut big = asset("A1", "Artefact");
    big.description = "x".repeat(150);
    let plan = plan(&[], &[big], date("2024-03-02")).unwrap();
    assert_eq!(
      plan.events[0].summary,
      format!("Asset added: {}...", "x".repeat(100))
    );
  }
}
