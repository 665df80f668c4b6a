//! SQL schema for the POEM history store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tenants (
    schema_name TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL
);

-- Snapshots are append-only. The backfill job may UPDATE serialized_data;
-- nothing else is ever updated and no row is ever deleted.
CREATE TABLE IF NOT EXISTS history (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant          TEXT NOT NULL REFERENCES tenants(schema_name),
    object_id       TEXT NOT NULL,
    content_type    TEXT NOT NULL,   -- '<app>.<model>' label
    object_repr     TEXT NOT NULL,
    serialized_data TEXT NOT NULL,   -- one-element JSON list
    date_created    TEXT NOT NULL,   -- RFC 3339 UTC, fixed microsecond width
    comment         TEXT NOT NULL,
    user            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS history_series_idx
    ON history(tenant, content_type, object_id, date_created, id);

PRAGMA user_version = 1;
";
