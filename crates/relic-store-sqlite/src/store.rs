//! [`SqliteStore`] — the SQLite implementation of [`AssetStore`].

use std::{collections::HashSet, path::Path};

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;

use relic_core::{
  asset::AssetVersion,
  change::SnapshotRun,
  raw::RawRecord,
  reconcile::ReconcilePlan,
  store::AssetStore,
};

use crate::{
  encode::{
    EventRow, VERSION_COLUMNS, VersionRow, encode_date, encode_source,
    version_row,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A relic store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── AssetStore impl ─────────────────────────────────────────────────────────

impl AssetStore for SqliteStore {
  type Error = Error;

  // ── Raw snapshot layer ────────────────────────────────────────────────────

  async fn append_raw(
    &self,
    snapshot_date: NaiveDate,
    records: Vec<RawRecord>,
  ) -> Result<usize> {
    let date_str = encode_date(snapshot_date);

    // Records without an id cannot be keyed; the harvester has already
    // logged them.
    let rows: Vec<(String, String)> = records
      .iter()
      .filter(|r| !r.asset_id.is_empty())
      .map(|r| Ok((r.asset_id.clone(), serde_json::to_string(&r.fields)?)))
      .collect::<Result<_>>()?;

    let stored = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "INSERT OR IGNORE INTO raw_snapshots (snapshot_date, asset_id, raw_json)
           VALUES (?1, ?2, ?3)",
        )?;
        let mut stored = 0;
        for (asset_id, raw_json) in &rows {
          stored += stmt.execute(rusqlite::params![date_str, asset_id, raw_json])?;
        }
        Ok(stored)
      })
      .await?;

    Ok(stored)
  }

  async fn raw_batch(&self, snapshot_date: NaiveDate) -> Result<Vec<RawRecord>> {
    let date_str = encode_date(snapshot_date);

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT asset_id, raw_json FROM raw_snapshots
           WHERE snapshot_date = ?1
           ORDER BY asset_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![date_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(asset_id, raw_json)| {
        Ok(RawRecord {
          asset_id,
          fields: serde_json::from_str(&raw_json)?,
        })
      })
      .collect()
  }

  async fn harvested_since(&self, cutoff: NaiveDate) -> Result<HashSet<String>> {
    let cutoff_str = encode_date(cutoff);

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT asset_id FROM raw_snapshots WHERE snapshot_date >= ?1",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![cutoff_str], |row| row.get(0))?
          .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(ids)
      })
      .await?;

    Ok(ids)
  }

  // ── Versioned layer ───────────────────────────────────────────────────────

  async fn live_versions(&self) -> Result<Vec<AssetVersion>> {
    let raws: Vec<VersionRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLUMNS} FROM asset_versions
           WHERE valid_until IS NULL
           ORDER BY asset_id"
        ))?;
        let rows = stmt
          .query_map([], version_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(VersionRow::into_version).collect()
  }

  async fn history(&self, asset_id: &str) -> Result<Vec<AssetVersion>> {
    let id = asset_id.to_string();

    let raws: Vec<VersionRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLUMNS} FROM asset_versions
           WHERE asset_id = ?1
           ORDER BY valid_from, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id], version_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(VersionRow::into_version).collect()
  }

  async fn version_counts(&self) -> Result<(u64, u64)> {
    let counts = self
      .conn
      .call(|conn| {
        let total: u64 =
          conn.query_row("SELECT COUNT(*) FROM asset_versions", [], |r| r.get(0))?;
        let live: u64 = conn.query_row(
          "SELECT COUNT(*) FROM asset_versions WHERE valid_until IS NULL",
          [],
          |r| r.get(0),
        )?;
        Ok((total, live))
      })
      .await?;

    Ok(counts)
  }

  // ── Pass commit ───────────────────────────────────────────────────────────

  async fn has_snapshot_run(&self, snapshot_date: NaiveDate) -> Result<bool> {
    let date_str = encode_date(snapshot_date);

    let exists = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM snapshot_runs WHERE snapshot_date = ?1",
            rusqlite::params![date_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(exists)
      })
      .await?;

    Ok(exists)
  }

  async fn commit_pass(&self, plan: ReconcilePlan, run: SnapshotRun) -> Result<()> {
    let snapshot_date = run.snapshot_date;
    let date_str = encode_date(snapshot_date);

    // Encode everything before entering the connection thread; only plain
    // strings cross into the closure.
    let versions: Vec<VersionRow> =
      plan.new_versions.iter().map(VersionRow::from_version).collect();
    let events: Vec<EventRow> = plan
      .events
      .iter()
      .map(EventRow::from_event)
      .collect::<Result<_>>()?;
    let close_ids = plan.close_ids;
    let source = encode_source(run.source);
    let source_file = run.source_file;
    let record_count = run.record_count as i64;
    let (added, updated, removed) =
      (run.added as i64, run.updated as i64, run.removed as i64);

    let committed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Re-check the idempotency key inside the transaction; the caller's
        // earlier check may have raced another pass.
        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM snapshot_runs WHERE snapshot_date = ?1",
            rusqlite::params![date_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if exists {
          return Ok(false);
        }

        {
          let mut close = tx.prepare(
            "UPDATE asset_versions SET valid_until = ?1
             WHERE asset_id = ?2 AND valid_until IS NULL",
          )?;
          for asset_id in &close_ids {
            close.execute(rusqlite::params![date_str, asset_id])?;
          }

          let mut insert = tx.prepare(
            "INSERT INTO asset_versions (
               asset_id, owner_id, description, location, category,
               access_details, contact_name, address_line1, address_line2,
               address_city, address_postcode, telephone, fax, email,
               website, valid_from, valid_until
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                       ?13, ?14, ?15, ?16, ?17)",
          )?;
          for v in &versions {
            insert.execute(rusqlite::params![
              v.asset_id,
              v.owner_id,
              v.description,
              v.location,
              v.category,
              v.access_details,
              v.contact_name,
              v.address_line1,
              v.address_line2,
              v.address_city,
              v.address_postcode,
              v.telephone,
              v.fax,
              v.email,
              v.website,
              v.valid_from,
              v.valid_until,
            ])?;
          }

          let mut event = tx.prepare(
            "INSERT INTO change_events
               (asset_id, change_type, change_date, changed_fields, summary)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for e in &events {
            event.execute(rusqlite::params![
              e.asset_id,
              e.change_type,
              e.change_date,
              e.changed_fields,
              e.summary,
            ])?;
          }

          tx.execute(
            "INSERT INTO snapshot_runs
               (snapshot_date, source, source_file, record_count,
                added_count, updated_count, removed_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              date_str,
              source,
              source_file,
              record_count,
              added,
              updated,
              removed,
            ],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !committed {
      return Err(Error::SnapshotAlreadyProcessed(snapshot_date));
    }
    Ok(())
  }
}
