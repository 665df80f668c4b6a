//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width so
//! that lexical order in SQL equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use poem_core::{
  history::{HistoryEntry, Tenant},
  schema::ContentType,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEntry::from_row`].
pub const ENTRY_COLUMNS: &str = "id, tenant, object_id, content_type, object_repr,
   serialized_data, date_created, comment, user";

/// Raw values read directly from a `history` row.
pub struct RawEntry {
  pub id:              i64,
  pub tenant:          String,
  pub object_id:       String,
  pub content_type:    String,
  pub object_repr:     String,
  pub serialized_data: String,
  pub date_created:    String,
  pub comment:         String,
  pub user:            String,
}

impl RawEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      tenant:          row.get(1)?,
      object_id:       row.get(2)?,
      content_type:    row.get(3)?,
      object_repr:     row.get(4)?,
      serialized_data: row.get(5)?,
      date_created:    row.get(6)?,
      comment:         row.get(7)?,
      user:            row.get(8)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      id:              self.id,
      tenant:          Tenant::new(self.tenant),
      object_id:       self.object_id,
      content_type:    ContentType::from_label(&self.content_type)?,
      object_repr:     self.object_repr,
      serialized_data: self.serialized_data,
      date_created:    decode_dt(&self.date_created)?,
      comment:         self.comment,
      user:            self.user,
    })
  }
}
