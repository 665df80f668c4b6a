//! Change comments between consecutive snapshots of a series.

use std::fmt;

use serde_json::Value;

use crate::{natural_key::NaturalKey, snapshot::FieldMap};

/// Comment stored with the first snapshot of every series.
pub const INITIAL_VERSION: &str = "Initial version.";

/// Comment stored when a save did not change any field.
pub const NO_CHANGES: &str = "No fields changed.";

/// One field-level difference between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
  Added { field: String, value: Value },
  Changed { field: String, from: Value, to: Value },
  Removed { field: String, value: Value },
}

impl FieldChange {
  pub fn field(&self) -> &str {
    match self {
      Self::Added { field, .. }
      | Self::Changed { field, .. }
      | Self::Removed { field, .. } => field,
    }
  }
}

impl fmt::Display for FieldChange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Added { field, value } => {
        write!(f, "{field} added with {}", render(value))
      }
      Self::Changed { field, from, to } => {
        write!(f, "{field} changed from {} to {}", render(from), render(to))
      }
      Self::Removed { field, value } => {
        write!(f, "{field} removed (was {})", render(value))
      }
    }
  }
}

/// Human-readable form of a stored value: strings bare, natural keys as
/// `name` or `name (version)`, everything else as compact JSON.
fn render(value: &Value) -> String {
  match value {
    Value::Null => "empty".to_owned(),
    Value::String(s) => s.clone(),
    other => match NaturalKey::from_json(other) {
      Some(key) => key.to_string(),
      None => other.to_string(),
    },
  }
}

/// Field-level differences from `previous` to `current`, in field-name order.
///
/// With no previous snapshot every field of `current` counts as added.
pub fn diff(previous: Option<&FieldMap>, current: &FieldMap) -> Vec<FieldChange> {
  let empty = FieldMap::new();
  let previous = previous.unwrap_or(&empty);

  let mut changes: Vec<FieldChange> = current
    .iter()
    .filter_map(|(field, to)| match previous.get(field) {
      None => Some(FieldChange::Added {
        field: field.clone(),
        value: to.clone(),
      }),
      Some(from) if from != to => Some(FieldChange::Changed {
        field: field.clone(),
        from:  from.clone(),
        to:    to.clone(),
      }),
      Some(_) => None,
    })
    .collect();

  changes.extend(
    previous
      .iter()
      .filter(|(field, _)| !current.contains_key(*field))
      .map(|(field, value)| FieldChange::Removed {
        field: field.clone(),
        value: value.clone(),
      }),
  );

  changes.sort_by(|a, b| a.field().cmp(b.field()));
  changes
}

/// The comment to store with a new snapshot whose predecessor in the series
/// is `previous`.
pub fn comment(previous: Option<&FieldMap>, current: &FieldMap) -> String {
  if previous.is_none() {
    return INITIAL_VERSION.to_owned();
  }

  let lines: Vec<String> = diff(previous, current)
    .iter()
    .map(ToString::to_string)
    .collect();

  if lines.is_empty() {
    NO_CHANGES.to_owned()
  } else {
    lines.join("\n")
  }
}
