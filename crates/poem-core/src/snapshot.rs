//! Snapshot records and the snapshot producer.
//!
//! A snapshot is stored as a JSON list holding exactly one record:
//!
//! ```json
//! [{"model": "poem.metric", "pk": 12, "fields": {"name": "...", "probekey": ["check_http", "2.1"]}}]
//! ```
//!
//! `fields` is a sorted map, so encoding the same record twice always yields
//! the same bytes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
  Error, Result,
  entity::{FieldValue, Versioned},
  natural_key::{NaturalKey, ReferenceResolver},
  schema::{ContentType, FieldKind, FieldSpec},
};

/// Field name → portable value.
pub type FieldMap = Map<String, Value>;

// ─── SerializedSnapshot ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSnapshot {
  pub model:  String,
  pub pk:     Option<i64>,
  pub fields: FieldMap,
}

impl SerializedSnapshot {
  /// Encode into the stored one-element-list form.
  pub fn encode(&self) -> Result<String> {
    Ok(serde_json::to_string(std::slice::from_ref(self))?)
  }

  /// Decode the stored one-element-list form.
  pub fn decode(raw: &str) -> Result<Self> {
    let mut records: Vec<Self> = serde_json::from_str(raw)?;
    if records.len() != 1 {
      return Err(Error::MalformedSnapshot(format!(
        "expected exactly one record, found {}",
        records.len()
      )));
    }
    Ok(records.remove(0))
  }

  pub fn content_type(&self) -> Result<ContentType> {
    ContentType::from_label(&self.model)
  }

  /// Rewrite the natural keys stored in the relation field described by
  /// `spec` through `keys` (old key → new key). Returns `true` if the payload
  /// changed.
  ///
  /// Each stored key is looked up once, by its value before the call, so one
  /// entry's replacement is never fed into another (`A → B` together with
  /// `B → C` turns `A` into `B`, not `C`). Fields that are absent, null, or
  /// not shaped like natural keys are left alone.
  pub fn rewrite_relation(
    &mut self,
    spec: &FieldSpec,
    keys: &HashMap<NaturalKey, NaturalKey>,
  ) -> bool {
    let Some(value) = self.fields.get_mut(spec.name) else {
      return false;
    };

    match spec.kind {
      FieldKind::Relation(_) => replace_key(value, keys),
      FieldKind::ManyRelation(_) => match value.as_array_mut() {
        Some(items) => items
          .iter_mut()
          .fold(false, |changed, item| replace_key(item, keys) || changed),
        None => false,
      },
      _ => false,
    }
  }
}

fn replace_key(value: &mut Value, keys: &HashMap<NaturalKey, NaturalKey>) -> bool {
  let Some(from) = NaturalKey::from_json(value) else {
    return false;
  };
  match keys.get(&from) {
    Some(to) if *to != from => {
      *value = to.to_json();
      true
    }
    _ => false,
  }
}

// ─── Producer ────────────────────────────────────────────────────────────────

/// What to store when a relation points at a row that no longer exists.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
  /// Keep the identity recorded in the previous snapshot of the series.
  #[default]
  LastKnown,
  /// Store `null`.
  Null,
}

/// Capture the current state of `entity` as a snapshot.
///
/// `previous` is the field map of the newest stored snapshot of the same
/// series; it is only consulted for dangling references under
/// [`DanglingPolicy::LastKnown`].
pub fn snapshot_of<E, R>(
  entity: &E,
  resolver: &R,
  policy: DanglingPolicy,
  previous: Option<&FieldMap>,
) -> Result<SerializedSnapshot>
where
  E: Versioned + ?Sized,
  R: ReferenceResolver + ?Sized,
{
  let content_type = entity.content_type();
  let mut fields = FieldMap::new();

  for spec in content_type.schema() {
    let value = entity.field(spec.name).ok_or(Error::UnknownField {
      content_type,
      field: spec.name,
    })?;

    let mismatch = || Error::FieldKindMismatch {
      content_type,
      field: spec.name,
      expected: spec.kind.describe(),
    };

    let json = match (spec.kind, value) {
      (_, FieldValue::Null) => Value::Null,
      (FieldKind::Text, FieldValue::Text(s)) => Value::String(s),
      (FieldKind::Integer, FieldValue::Integer(i)) => Value::from(i),
      (FieldKind::Boolean, FieldValue::Boolean(b)) => Value::Bool(b),
      (FieldKind::Json, FieldValue::Json(v)) => v,
      (FieldKind::Relation(_), FieldValue::Ref(None)) => Value::Null,
      (FieldKind::Relation(target), FieldValue::Ref(Some(id))) => {
        match resolver.resolve(target, id) {
          Ok(key) => key.to_json(),
          Err(Error::DanglingReference { .. }) => {
            let fallback = match policy {
              DanglingPolicy::LastKnown => previous
                .and_then(|p| p.get(spec.name))
                .cloned()
                .unwrap_or(Value::Null),
              DanglingPolicy::Null => Value::Null,
            };
            warn!(
              %content_type,
              field = spec.name,
              relation = %target,
              id,
              ?policy,
              stored = %fallback,
              "dangling reference while serializing"
            );
            fallback
          }
          Err(e) => return Err(e),
        }
      }
      (FieldKind::ManyRelation(target), FieldValue::Refs(ids)) => {
        let mut keys = Vec::with_capacity(ids.len());
        for id in ids {
          match resolver.resolve(target, id) {
            Ok(key) => keys.push(key.to_json()),
            Err(Error::DanglingReference { .. }) => {
              warn!(
                %content_type,
                field = spec.name,
                relation = %target,
                id,
                "dropping dangling reference from list"
              );
            }
            Err(e) => return Err(e),
          }
        }
        Value::Array(keys)
      }
      _ => return Err(mismatch()),
    };

    fields.insert(spec.name.to_owned(), json);
  }

  Ok(SerializedSnapshot {
    model: content_type.label().to_owned(),
    pk: entity.pk(),
    fields,
  })
}
