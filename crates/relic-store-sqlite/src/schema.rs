//! SQL schema for the relic SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Raw harvested data, exactly as scraped. Strictly append-only.
CREATE TABLE IF NOT EXISTS raw_snapshots (
    id            INTEGER PRIMARY KEY,
    snapshot_date TEXT NOT NULL,    -- ISO 8601 date
    asset_id      TEXT NOT NULL,
    raw_json      TEXT NOT NULL,    -- field map as harvested
    UNIQUE (snapshot_date, asset_id)
);

-- One row per historical state of an asset (SCD Type 2).
-- valid_until IS NULL marks the live version; the reconciler's commit is
-- the only writer that ever sets it.
CREATE TABLE IF NOT EXISTS asset_versions (
    id               INTEGER PRIMARY KEY,
    asset_id         TEXT NOT NULL,
    owner_id         TEXT,
    description      TEXT NOT NULL,
    location         TEXT NOT NULL,
    category         TEXT NOT NULL,
    access_details   TEXT,
    contact_name     TEXT,
    address_line1    TEXT,
    address_line2    TEXT,
    address_city     TEXT,
    address_postcode TEXT,
    telephone        TEXT,
    fax              TEXT,
    email            TEXT,
    website          TEXT,
    valid_from       TEXT NOT NULL,
    valid_until      TEXT
);

-- Human-readable change feed. Append-only.
CREATE TABLE IF NOT EXISTS change_events (
    id             INTEGER PRIMARY KEY,
    asset_id       TEXT NOT NULL,
    change_type    TEXT NOT NULL,   -- 'added' | 'updated' | 'removed'
    change_date    TEXT NOT NULL,
    changed_fields TEXT NOT NULL DEFAULT '[]',
    summary        TEXT NOT NULL
);

-- One row per reconciliation pass; the UNIQUE date is the idempotency key.
CREATE TABLE IF NOT EXISTS snapshot_runs (
    id            INTEGER PRIMARY KEY,
    snapshot_date TEXT NOT NULL UNIQUE,
    source        TEXT NOT NULL,    -- 'harvest' | 'import'
    source_file   TEXT,
    record_count  INTEGER NOT NULL,
    added_count   INTEGER NOT NULL DEFAULT 0,
    updated_count INTEGER NOT NULL DEFAULT 0,
    removed_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS raw_snapshots_date_idx   ON raw_snapshots(snapshot_date);
CREATE INDEX IF NOT EXISTS asset_versions_asset_idx ON asset_versions(asset_id);
CREATE INDEX IF NOT EXISTS asset_versions_live_idx  ON asset_versions(asset_id)
    WHERE valid_until IS NULL;
CREATE INDEX IF NOT EXISTS change_events_date_idx   ON change_events(change_date);

PRAGMA user_version = 1;
";
