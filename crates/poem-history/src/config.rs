//! Runtime configuration.
//!
//! Read from an optional TOML file and `POEM_`-prefixed environment variables
//! (nested keys use `__`, e.g. `POEM_WEB_API__BASE_URL`).

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use ::config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use poem_core::{history::Tenant, snapshot::DanglingPolicy};
use poem_store_sqlite::SqliteHistoryStore;
use serde::Deserialize;

use crate::Result;

const DEFAULT_STORE_PATH: &str = "poem-history.sqlite3";

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
  /// SQLite file holding the history log; a leading `~/` is expanded.
  pub store_path:      PathBuf,
  /// Tenants the backfill job processes. Empty means every registered tenant.
  #[serde(default)]
  pub tenants:         Vec<String>,
  #[serde(default)]
  pub dangling_policy: DanglingPolicy,
  #[serde(default)]
  pub web_api:         Option<WebApiConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebApiConfig {
  pub base_url:     String,
  /// Tenant schema name → `x-api-key` token.
  #[serde(default)]
  pub tokens:       HashMap<String, String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl HistoryConfig {
  /// Load from `path` (if given and present) overlaid with the environment.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = Self::builder()?;
    if let Some(path) = path {
      builder = builder.add_source(File::from(path).required(false));
    }
    let settings = builder
      .add_source(
        Environment::with_prefix("POEM")
          .prefix_separator("_")
          .separator("__")
          .list_separator(",")
          .with_list_parse_key("tenants")
          .try_parsing(true),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// Parse a TOML document, without consulting the environment.
  pub fn from_toml(raw: &str) -> Result<Self> {
    let settings = Self::builder()?
      .add_source(File::from_str(raw, FileFormat::Toml))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  fn builder() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder().set_default("store_path", DEFAULT_STORE_PATH)?)
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  /// The configured tenant filter, or `None` for "all registered tenants".
  pub fn tenant_filter(&self) -> Option<Vec<Tenant>> {
    if self.tenants.is_empty() {
      None
    } else {
      Some(self.tenants.iter().map(Tenant::new).collect())
    }
  }

  pub async fn open_store(&self) -> Result<SqliteHistoryStore> {
    let path = self.store_path();
    tracing::info!(path = %path.display(), "opening history store");
    SqliteHistoryStore::open(&path)
      .await
      .map_err(crate::Error::store)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
