//! Error type for `poem-history`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] poem_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("configuration error: {0}")]
  Config(#[from] ::config::ConfigError),

  #[error("web api error: {0}")]
  WebApi(#[from] reqwest::Error),
}

impl Error {
  /// Box an error coming from a generic [`poem_core::store::HistoryStore`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
