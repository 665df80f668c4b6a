//! The POEM history write path and maintenance jobs.
//!
//! - [`recorder::HistoryRecorder`] is called explicitly after a domain object
//!   has been saved and appends exactly one snapshot for that save.
//! - [`backfill::BackfillJob`] rewrites stored snapshots when the natural key
//!   of an upstream entity (a probe version, a group) changes.
//! - [`upstream`] mirrors profile fields from the external web API.
//!
//! Both work against any [`poem_core::store::HistoryStore`]; [`config`] knows
//! how to open the SQLite one.

pub mod backfill;
pub mod config;
pub mod error;
pub mod recorder;
pub mod upstream;

pub use error::{Error, Result};
