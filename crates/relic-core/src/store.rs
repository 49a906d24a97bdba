//! The `AssetStore` trait — the boundary to persistent storage.
//!
//! The trait is implemented by storage backends (e.g. `relic-store-sqlite`).
//! Higher layers (the harvester, the reconciliation driver, the CLI) depend
//! on this abstraction, not on any concrete backend.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes.

use std::{collections::HashSet, future::Future};

use chrono::NaiveDate;

use crate::{
  asset::AssetVersion,
  change::SnapshotRun,
  raw::RawRecord,
  reconcile::ReconcilePlan,
};

/// Abstraction over a relic storage backend.
///
/// Raw records and change events are append-only. Version rows are written
/// by [`commit_pass`](AssetStore::commit_pass) alone, which owns the only
/// mutation the model permits: setting `valid_until` on a live version.
pub trait AssetStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Raw snapshot layer ────────────────────────────────────────────────

  /// Persist raw records for a snapshot date. Records already present for
  /// `(date, asset_id)` are skipped, so interrupted harvests can re-run.
  /// Returns the number of newly stored records.
  fn append_raw(
    &self,
    snapshot_date: NaiveDate,
    records: Vec<RawRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All raw records stored for one snapshot date.
  fn raw_batch(
    &self,
    snapshot_date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<RawRecord>, Self::Error>> + Send + '_;

  /// Asset ids with a raw record dated `cutoff` or later. Used by
  /// incremental harvests to skip recently refreshed assets.
  fn harvested_since(
    &self,
    cutoff: NaiveDate,
  ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send + '_;

  // ── Versioned layer ───────────────────────────────────────────────────

  /// The current live version of every asset (`valid_until IS NULL`).
  fn live_versions(
    &self,
  ) -> impl Future<Output = Result<Vec<AssetVersion>, Self::Error>> + Send + '_;

  /// Full version history for one asset, oldest first.
  fn history<'a>(
    &'a self,
    asset_id: &'a str,
  ) -> impl Future<Output = Result<Vec<AssetVersion>, Self::Error>> + Send + 'a;

  /// `(total version rows, live version rows)` — operator reporting.
  fn version_counts(
    &self,
  ) -> impl Future<Output = Result<(u64, u64), Self::Error>> + Send + '_;

  // ── Pass commit ───────────────────────────────────────────────────────

  /// Whether a reconciliation pass has already been recorded for `date`.
  fn has_snapshot_run(
    &self,
    snapshot_date: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Apply one reconciliation pass atomically: close versions, open new
  /// ones, append change events, and record the snapshot run — all or
  /// nothing. Implementations must re-check the snapshot-run key inside
  /// the same transaction and fail if the date was processed concurrently.
  fn commit_pass(
    &self,
    plan: ReconcilePlan,
    run: SnapshotRun,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
