//! SQLite backend for the POEM history log.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Tenants share one database file; every
//! row carries its tenant and every query filters on it.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteHistoryStore;

#[cfg(test)]
mod tests;
