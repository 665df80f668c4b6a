//! Natural keys and their resolution against live data.
//!
//! Internal numeric ids are local to a tenant schema and may be reused or
//! deleted, so history never stores them. Relation fields are written as the
//! referenced row's natural key instead: `["name"]` or `["name", "version"]`.

use std::{collections::HashMap, fmt};

use serde_json::Value;

use crate::{Error, Result, schema::RelationTarget};

// ─── NaturalKey ──────────────────────────────────────────────────────────────

/// A stable, human-readable identity for a referenced row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
  Name(String),
  NameVersion { name: String, version: String },
}

impl NaturalKey {
  pub fn name(name: impl Into<String>) -> Self { Self::Name(name.into()) }

  pub fn name_version(name: impl Into<String>, version: impl Into<String>) -> Self {
    Self::NameVersion {
      name:    name.into(),
      version: version.into(),
    }
  }

  /// The list encoding used inside snapshot payloads.
  pub fn to_json(&self) -> Value {
    match self {
      Self::Name(name) => Value::from(vec![name.as_str()]),
      Self::NameVersion { name, version } => {
        Value::from(vec![name.as_str(), version.as_str()])
      }
    }
  }

  /// Parse the list encoding. Returns `None` for anything that is not a one-
  /// or two-element list of strings.
  pub fn from_json(value: &Value) -> Option<Self> {
    match value.as_array()?.as_slice() {
      [Value::String(name)] => Some(Self::Name(name.clone())),
      [Value::String(name), Value::String(version)] => {
        Some(Self::name_version(name.clone(), version.clone()))
      }
      _ => None,
    }
  }

  pub fn arity(&self) -> usize {
    match self {
      Self::Name(_) => 1,
      Self::NameVersion { .. } => 2,
    }
  }
}

impl fmt::Display for NaturalKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Name(name) => f.write_str(name),
      Self::NameVersion { name, version } => write!(f, "{name} ({version})"),
    }
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Maps a live relation value to its natural key.
pub trait ReferenceResolver {
  /// Resolve `id` of kind `target`.
  ///
  /// Returns [`Error::DanglingReference`] when the row no longer exists.
  fn resolve(&self, target: RelationTarget, id: i64) -> Result<NaturalKey>;
}

/// An in-memory lookup table built from live rows.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
  keys: HashMap<(RelationTarget, i64), NaturalKey>,
}

impl ReferenceCatalog {
  pub fn new() -> Self { Self::default() }

  /// Register (or replace) the natural key of a live row. Returns the key it
  /// replaced, if any.
  pub fn insert(
    &mut self,
    target: RelationTarget,
    id: i64,
    key: NaturalKey,
  ) -> Option<NaturalKey> {
    debug_assert_eq!(target.arity(), key.arity(), "wrong key arity for {target}");
    self.keys.insert((target, id), key)
  }

  pub fn remove(&mut self, target: RelationTarget, id: i64) -> Option<NaturalKey> {
    self.keys.remove(&(target, id))
  }

  pub fn len(&self) -> usize { self.keys.len() }

  pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}

impl ReferenceResolver for ReferenceCatalog {
  fn resolve(&self, target: RelationTarget, id: i64) -> Result<NaturalKey> {
    self
      .keys
      .get(&(target, id))
      .cloned()
      .ok_or(Error::DanglingReference { target, id })
  }
}
