//! `relic` — command-line driver for the heritage-register tracker.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! SQLite store, and runs one of:
//!
//! ```text
//! relic harvest                  # full harvest + reconcile, dated today
//! relic harvest --incremental    # refresh stale assets, store raw only
//! relic process --date 2024-03-02 [--dry-run]
//! relic import --file snapshot.csv --date 2023-01-25
//! relic history --id 12345
//! ```

mod import;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};
use relic_core::{
  change::{PassResult, SnapshotSource},
  reconcile::{plan, run_pass},
  store::AssetStore,
  tidy::tidy,
};
use relic_harvest::{harvester::pending, HarvestConfig, Harvester};
use relic_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Heritage-register tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Harvest the register. Full mode stores the batch and reconciles it;
  /// incremental mode stores raw records progressively and leaves
  /// reconciliation to `process`.
  Harvest {
    /// Only fetch assets without a raw record in the last `--skip-days`.
    #[arg(long)]
    incremental: bool,

    /// Exclusion window for incremental mode, in days.
    #[arg(long, default_value_t = 7)]
    skip_days: u64,

    /// Cap the number of detail fetches (testing aid).
    #[arg(long)]
    limit: Option<usize>,

    /// List what would be fetched without fetching anything.
    #[arg(long)]
    dry_run: bool,
  },

  /// Reconcile the stored raw batch for one date into the version history.
  Process {
    /// Snapshot date (YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,

    /// Compute the pass without committing anything.
    #[arg(long)]
    dry_run: bool,
  },

  /// Import a historical CSV snapshot and reconcile it.
  Import {
    /// Path to the CSV download.
    #[arg(long)]
    file: PathBuf,

    /// The date the snapshot was taken (YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
  },

  /// Show the recorded version history of one asset.
  History {
    /// Register asset id.
    #[arg(long)]
    id: String,
  },
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Application configuration, deserialised from `config.toml` with
/// `RELIC_`-prefixed environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct AppConfig {
  store_path: PathBuf,
  harvest:    HarvestConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("relic.db"),
      harvest:    HarvestConfig::default(),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("RELIC"))
    .build()
    .context("failed to read config file")?;

  let app: AppConfig = settings
    .try_deserialize()
    .context("failed to deserialise AppConfig")?;

  let store = SqliteStore::open(&app.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", app.store_path))?;

  match cli.command {
    Command::Harvest { incremental, skip_days, limit, dry_run } => {
      harvest(&store, app.harvest, incremental, skip_days, limit, dry_run).await
    }
    Command::Process { date, dry_run } => process(&store, date, dry_run).await,
    Command::Import { file, date } => import_csv(&store, &file, date).await,
    Command::History { id } => history(&store, &id).await,
  }
}

// ─── Subcommands ──────────────────────────────────────────────────────────────

async fn harvest(
  store: &SqliteStore,
  config: HarvestConfig,
  incremental: bool,
  skip_days: u64,
  limit: Option<usize>,
  dry_run: bool,
) -> Result<()> {
  let harvester = Harvester::new(config)?;
  let today = chrono::Local::now().date_naive();

  if dry_run {
    let summaries = harvester.fetch_summaries().await?;
    let recent = if incremental {
      let cutoff = today
        .checked_sub_days(Days::new(skip_days))
        .unwrap_or(NaiveDate::MIN);
      store.harvested_since(cutoff).await?
    } else {
      Default::default()
    };

    let to_fetch = pending(&summaries, &recent);
    info!(
      listed = summaries.len(),
      pending = to_fetch.len(),
      "dry run; nothing fetched"
    );
    for summary in to_fetch.iter().take(20) {
      info!(asset_id = %summary.asset_id, description = %summary.description, "would fetch");
    }
    if to_fetch.len() > 20 {
      info!(remaining = to_fetch.len() - 20, "further assets not listed");
    }
    return Ok(());
  }

  if incremental {
    let outcome = harvester
      .harvest_incremental(store, today, skip_days, limit)
      .await?;
    info!(
      stored = outcome.stored,
      candidates = outcome.candidates,
      errors = outcome.errors,
      "incremental harvest finished; run `relic process` once the batch is complete"
    );
    return Ok(());
  }

  // Full harvest: refuse up front rather than after an hours-long fetch.
  if store.has_snapshot_run(today).await? {
    bail!("snapshot {today} has already been processed");
  }

  let outcome = harvester.harvest_full().await?;
  info!(
    records = outcome.records.len(),
    errors = outcome.errors,
    "storing raw batch"
  );
  store.append_raw(today, outcome.records).await?;

  let batch = store.raw_batch(today).await?;
  let result = run_pass(store, today, SnapshotSource::Harvest, None, &batch).await?;
  report(store, result).await
}

async fn process(store: &SqliteStore, date: NaiveDate, dry_run: bool) -> Result<()> {
  let batch = store.raw_batch(date).await?;
  info!(records = batch.len(), %date, "loaded raw batch");

  if dry_run {
    let tidied: Vec<_> = batch.iter().map(tidy).collect();
    let live = store.live_versions().await?;
    let preview = plan(&live, &tidied, date)?;
    let result = preview.result;
    info!(
      added = result.added,
      updated = result.updated,
      removed = result.removed,
      unchanged = result.unchanged,
      "dry run; nothing committed"
    );
    return Ok(());
  }

  let result = run_pass(store, date, SnapshotSource::Harvest, None, &batch).await?;
  report(store, result).await
}

async fn import_csv(store: &SqliteStore, file: &Path, date: NaiveDate) -> Result<()> {
  if store.has_snapshot_run(date).await? {
    bail!("snapshot {date} has already been processed");
  }

  let records = import::load_csv(file)?;
  info!(
    records = records.len(),
    file = %file.display(),
    %date,
    "loaded historical snapshot"
  );

  store.append_raw(date, records).await?;
  let batch = store.raw_batch(date).await?;

  let source_file = file
    .file_name()
    .map(|name| name.to_string_lossy().into_owned());
  let result = run_pass(store, date, SnapshotSource::Import, source_file, &batch).await?;
  report(store, result).await
}

async fn history(store: &SqliteStore, asset_id: &str) -> Result<()> {
  let versions = store.history(asset_id).await?;
  if versions.is_empty() {
    info!(asset_id, "no versions recorded");
    return Ok(());
  }

  for version in &versions {
    let until = version
      .valid_until
      .map_or_else(|| "live".to_string(), |d| d.to_string());
    info!(
      asset_id,
      valid_from = %version.valid_from,
      valid_until = %until,
      category = %version.asset.category,
      description = %version.asset.description,
      "version"
    );
  }
  Ok(())
}

async fn report(store: &SqliteStore, result: PassResult) -> Result<()> {
  info!(
    added = result.added,
    updated = result.updated,
    removed = result.removed,
    unchanged = result.unchanged,
    "pass committed"
  );

  let (total, live) = store.version_counts().await?;
  info!(total_versions = total, live_assets = live, "store totals");
  Ok(())
}
