//! Error types for `poem-core`.

use thiserror::Error;

use crate::schema::{ContentType, RelationTarget};

#[derive(Debug, Error)]
pub enum Error {
  #[error("dangling reference: no {target} with id {id}")]
  DanglingReference { target: RelationTarget, id: i64 },

  #[error("{content_type} has no field {field:?}")]
  UnknownField {
    content_type: ContentType,
    field:        &'static str,
  },

  #[error("field {field:?} of {content_type} does not hold a {expected} value")]
  FieldKindMismatch {
    content_type: ContentType,
    field:        &'static str,
    expected:     &'static str,
  },

  #[error("{0} has not been saved yet")]
  UnsavedObject(ContentType),

  #[error("unknown content type label: {0:?}")]
  UnknownContentType(String),

  #[error("malformed snapshot: {0}")]
  MalformedSnapshot(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
