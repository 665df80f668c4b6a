//! Core types and trait definitions for the POEM history subsystem.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the per-entity schemas, the natural-key model, the snapshot producer and the
//! comment generator; storage backends implement [`store::HistoryStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod comment;
pub mod entity;
pub mod error;
pub mod history;
pub mod natural_key;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
