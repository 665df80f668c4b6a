//! Error type for `poem-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] poem_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The tenant was never registered with [`crate::SqliteHistoryStore`].
  #[error("unknown tenant: {0}")]
  UnknownTenant(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
