//! [`SqliteHistoryStore`], the SQLite implementation of [`HistoryStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use poem_core::{
  history::{HistoryEntry, NewHistoryEntry, Tenant},
  schema::ContentType,
  store::HistoryStore,
};

use crate::{
  Error, Result,
  encode::{ENTRY_COLUMNS, RawEntry, decode_dt, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A POEM history log backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteHistoryStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteHistoryStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
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

  /// Run a `SELECT` over `history` with the given `WHERE ... ORDER BY` tail
  /// and positional text parameters.
  async fn query_entries(
    &self,
    tail: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<HistoryEntry>> {
    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM history {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }
}

// ─── HistoryStore impl ───────────────────────────────────────────────────────

impl HistoryStore for SqliteHistoryStore {
  type Error = Error;

  // ── Tenants ───────────────────────────────────────────────────────────────

  async fn register_tenant<'a>(&'a self, tenant: &'a Tenant) -> Result<()> {
    let name_str = tenant.as_str().to_owned();
    let at_str   = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO tenants (schema_name, created_at) VALUES (?1, ?2)",
          rusqlite::params![name_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_tenants(&self) -> Result<Vec<Tenant>> {
    let names: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT schema_name FROM tenants ORDER BY schema_name")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(names.into_iter().map(Tenant::new).collect())
  }

  // ── Append-only writes ────────────────────────────────────────────────────

  async fn append<'a>(
    &'a self,
    tenant: &'a Tenant,
    input: NewHistoryEntry,
  ) -> Result<HistoryEntry> {
    let tenant_str       = tenant.as_str().to_owned();
    let content_type_str = input.content_type.label().to_owned();
    let now_str          = encode_dt(Utc::now());
    let row              = input.clone();

    let inserted: Option<(i64, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let known = tx
          .query_row(
            "SELECT 1 FROM tenants WHERE schema_name = ?1",
            rusqlite::params![tenant_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !known {
          return Ok(None);
        }

        // Never let a clock step backwards reorder the series.
        let newest: Option<String> = tx.query_row(
          "SELECT MAX(date_created) FROM history
           WHERE tenant = ?1 AND content_type = ?2 AND object_id = ?3",
          rusqlite::params![tenant_str, content_type_str, row.object_id],
          |r| r.get(0),
        )?;
        let date_created = match newest {
          Some(newest) if newest > now_str => newest,
          _ => now_str,
        };

        tx.execute(
          "INSERT INTO history (
             tenant, object_id, content_type, object_repr,
             serialized_data, date_created, comment, user
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            tenant_str,
            row.object_id,
            content_type_str,
            row.object_repr,
            row.serialized_data,
            date_created,
            row.comment,
            row.user,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Some((id, date_created)))
      })
      .await?;

    let (id, date_str) =
      inserted.ok_or_else(|| Error::UnknownTenant(tenant.to_string()))?;

    Ok(HistoryEntry {
      id,
      tenant: tenant.clone(),
      object_id: input.object_id,
      content_type: input.content_type,
      object_repr: input.object_repr,
      serialized_data: input.serialized_data,
      date_created: decode_dt(&date_str)?,
      comment: input.comment,
      user: input.user,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list<'a>(
    &'a self,
    tenant: &'a Tenant,
    object_id: &'a str,
    content_type: ContentType,
  ) -> Result<Vec<HistoryEntry>> {
    self
      .query_entries(
        "WHERE tenant = ?1 AND content_type = ?2 AND object_id = ?3
         ORDER BY date_created DESC, id DESC",
        vec![
          tenant.as_str().to_owned(),
          content_type.label().to_owned(),
          object_id.to_owned(),
        ],
      )
      .await
  }

  async fn latest<'a>(
    &'a self,
    tenant: &'a Tenant,
    object_id: &'a str,
    content_type: ContentType,
  ) -> Result<Option<HistoryEntry>> {
    let mut newest = self
      .query_entries(
        "WHERE tenant = ?1 AND content_type = ?2 AND object_id = ?3
         ORDER BY date_created DESC, id DESC
         LIMIT 1",
        vec![
          tenant.as_str().to_owned(),
          content_type.label().to_owned(),
          object_id.to_owned(),
        ],
      )
      .await?;
    Ok(newest.pop())
  }

  async fn entries_of_type<'a>(
    &'a self,
    tenant: &'a Tenant,
    content_type: ContentType,
  ) -> Result<Vec<HistoryEntry>> {
    self
      .query_entries(
        "WHERE tenant = ?1 AND content_type = ?2
         ORDER BY date_created ASC, id ASC",
        vec![tenant.as_str().to_owned(), content_type.label().to_owned()],
      )
      .await
  }

  // ── Backfill ──────────────────────────────────────────────────────────────

  async fn rewrite_serialized<'a>(
    &'a self,
    tenant: &'a Tenant,
    rewrites: Vec<(i64, String)>,
  ) -> Result<usize> {
    if rewrites.is_empty() {
      return Ok(0);
    }
    let tenant_str = tenant.as_str().to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut updated = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE history SET serialized_data = ?1 WHERE id = ?2 AND tenant = ?3",
          )?;
          for (id, data) in &rewrites {
            updated += stmt.execute(rusqlite::params![data, id, tenant_str])?;
          }
        }
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    Ok(updated)
  }
}
