//! The `HistoryStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `poem-store-sqlite`).
//! The recorder and backfill job in `poem-history` depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  history::{HistoryEntry, NewHistoryEntry, Tenant},
  schema::ContentType,
};

/// Abstraction over a per-tenant, append-only history log.
///
/// Every operation takes the tenant explicitly; entries of one tenant are
/// never visible through another.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait HistoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tenants ───────────────────────────────────────────────────────────

  /// Register a tenant. Registering an existing tenant is a no-op.
  fn register_tenant<'a>(
    &'a self,
    tenant: &'a Tenant,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// All registered tenants, sorted by name.
  fn list_tenants(
    &self,
  ) -> impl Future<Output = Result<Vec<Tenant>, Self::Error>> + Send + '_;

  // ── Append-only writes ────────────────────────────────────────────────

  /// Insert a new entry and return it as persisted. `date_created` is set by
  /// the store and never precedes the newest entry of the same series.
  ///
  /// Fails if the tenant is not registered.
  fn append<'a>(
    &'a self,
    tenant: &'a Tenant,
    input: NewHistoryEntry,
  ) -> impl Future<Output = Result<HistoryEntry, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All entries of a series, newest first.
  fn list<'a>(
    &'a self,
    tenant: &'a Tenant,
    object_id: &'a str,
    content_type: ContentType,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + 'a;

  /// The newest entry of a series, or `None` if the series has no history.
  fn latest<'a>(
    &'a self,
    tenant: &'a Tenant,
    object_id: &'a str,
    content_type: ContentType,
  ) -> impl Future<Output = Result<Option<HistoryEntry>, Self::Error>> + Send + 'a;

  /// Every entry of one content type in a tenant, in durable (oldest first)
  /// order.
  fn entries_of_type<'a>(
    &'a self,
    tenant: &'a Tenant,
    content_type: ContentType,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + 'a;

  // ── Backfill ──────────────────────────────────────────────────────────

  /// Replace `serialized_data` of the given entries, atomically. No other
  /// column is touched. Returns the number of rows updated.
  fn rewrite_serialized<'a>(
    &'a self,
    tenant: &'a Tenant,
    rewrites: Vec<(i64, String)>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
