//! Tenants and history entries.
//!
//! A history entry is an immutable snapshot of one domain object, written once
//! per save. The only mutation ever applied is the backfill rewrite of
//! `serialized_data`; the timestamp, comment, user and identity never change.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, schema::ContentType, snapshot::SerializedSnapshot};

// ─── Tenant ──────────────────────────────────────────────────────────────────

/// An isolated namespace holding one organisation's data.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tenant(String);

impl Tenant {
  /// Tenant holding shared super-admin data (probes, metric templates).
  pub const PUBLIC: &'static str = "public";

  pub fn new(schema: impl Into<String>) -> Self { Self(schema.into()) }

  pub fn public() -> Self { Self::new(Self::PUBLIC) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Tenant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── HistoryEntry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  /// Store-assigned; strictly increasing in insertion order.
  pub id:              i64,
  pub tenant:          Tenant,
  pub object_id:       String,
  pub content_type:    ContentType,
  pub object_repr:     String,
  /// JSON-encoded [`SerializedSnapshot`].
  pub serialized_data: String,
  /// Server-assigned; never changes after creation.
  pub date_created:    DateTime<Utc>,
  pub comment:         String,
  pub user:            String,
}

impl HistoryEntry {
  pub fn snapshot(&self) -> Result<SerializedSnapshot> {
    SerializedSnapshot::decode(&self.serialized_data)
  }
}

/// Input to [`crate::store::HistoryStore::append`].
/// `id` and `date_created` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub object_id:       String,
  pub content_type:    ContentType,
  pub object_repr:     String,
  pub serialized_data: String,
  pub comment:         String,
  pub user:            String,
}
