//! Versioned domain objects.
//!
//! These are the live, mutable rows whose state the history log captures.
//! Each type answers field lookups for the names in its
//! [`schema`](crate::schema::ContentType::schema); relation fields carry raw
//! internal ids that the snapshot producer resolves to natural keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{ContentType, LOCAL_PROFILE_FIELDS};

// ─── FieldValue ──────────────────────────────────────────────────────────────

/// The live value of one field, before natural-key resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Null,
  Text(String),
  Integer(i64),
  Boolean(bool),
  Json(Value),
  /// Internal id of the referenced row, if set.
  Ref(Option<i64>),
  /// Internal ids of a many-to-many relation.
  Refs(Vec<i64>),
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<Option<&str>> for FieldValue {
  fn from(s: Option<&str>) -> Self { s.map_or(Self::Null, Self::from) }
}

// ─── Versioned ───────────────────────────────────────────────────────────────

/// A domain object whose saves are recorded in the history log.
pub trait Versioned {
  fn content_type(&self) -> ContentType;

  /// Primary key, or `None` if the object has never been saved.
  fn pk(&self) -> Option<i64>;

  /// The `object_repr` column written alongside each snapshot.
  fn object_repr(&self) -> String;

  /// Current value of the schema field `name`; `None` if this type has no
  /// such field.
  fn field(&self, name: &str) -> Option<FieldValue>;
}

// ─── Probe ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Probe {
  pub id:          Option<i64>,
  pub name:        String,
  pub version:     String,
  pub package:     Option<i64>,
  pub description: String,
  /// Release note for this probe version.
  pub comment:     String,
  pub repository:  String,
  pub docurl:      String,
}

impl Versioned for Probe {
  fn content_type(&self) -> ContentType { ContentType::Probe }

  fn pk(&self) -> Option<i64> { self.id }

  fn object_repr(&self) -> String { format!("{} ({})", self.name, self.version) }

  fn field(&self, name: &str) -> Option<FieldValue> {
    Some(match name {
      "name" => self.name.as_str().into(),
      "version" => self.version.as_str().into(),
      "package" => FieldValue::Ref(self.package),
      "description" => self.description.as_str().into(),
      "comment" => self.comment.as_str().into(),
      "repository" => self.repository.as_str().into(),
      "docurl" => self.docurl.as_str().into(),
      _ => return None,
    })
  }
}

// ─── Metric templates and metrics ────────────────────────────────────────────

/// Probe configuration shared by metric templates and metrics. Each section is
/// a JSON list of `"key value"` strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
  pub config:        Value,
  pub attribute:     Value,
  pub dependency:    Value,
  pub flags:         Value,
  pub files:         Value,
  pub parameter:     Value,
  pub fileparameter: Value,
}

impl ProbeConfig {
  fn field(&self, name: &str) -> Option<FieldValue> {
    let value = match name {
      "config" => &self.config,
      "attribute" => &self.attribute,
      "dependency" => &self.dependency,
      "flags" => &self.flags,
      "files" => &self.files,
      "parameter" => &self.parameter,
      "fileparameter" => &self.fileparameter,
      _ => return None,
    };
    Some(FieldValue::Json(value.clone()))
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricTemplate {
  pub id:              Option<i64>,
  pub name:            String,
  pub mtype:           Option<i64>,
  /// The probe version this template executes; `None` for passive templates.
  pub probekey:        Option<i64>,
  pub parent:          Option<i64>,
  pub probeexecutable: Option<String>,
  #[serde(flatten)]
  pub probe_config:    ProbeConfig,
  pub tags:            Vec<i64>,
  pub description:     String,
}

impl Versioned for MetricTemplate {
  fn content_type(&self) -> ContentType { ContentType::MetricTemplate }

  fn pk(&self) -> Option<i64> { self.id }

  fn object_repr(&self) -> String { self.name.clone() }

  fn field(&self, name: &str) -> Option<FieldValue> {
    Some(match name {
      "name" => self.name.as_str().into(),
      "mtype" => FieldValue::Ref(self.mtype),
      "probekey" => FieldValue::Ref(self.probekey),
      "parent" => FieldValue::Ref(self.parent),
      "probeexecutable" => self.probeexecutable.as_deref().into(),
      "tags" => FieldValue::Refs(self.tags.clone()),
      "description" => self.description.as_str().into(),
      other => return self.probe_config.field(other),
    })
  }
}

/// A tenant's metric, usually instantiated from a [`MetricTemplate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metric {
  pub id:              Option<i64>,
  pub name:            String,
  pub mtype:           Option<i64>,
  pub group:           Option<i64>,
  pub probekey:        Option<i64>,
  pub parent:          Option<i64>,
  pub probeexecutable: Option<String>,
  #[serde(flatten)]
  pub probe_config:    ProbeConfig,
  pub description:     String,
}

impl Versioned for Metric {
  fn content_type(&self) -> ContentType { ContentType::Metric }

  fn pk(&self) -> Option<i64> { self.id }

  fn object_repr(&self) -> String { self.name.clone() }

  fn field(&self, name: &str) -> Option<FieldValue> {
    Some(match name {
      "name" => self.name.as_str().into(),
      "mtype" => FieldValue::Ref(self.mtype),
      "group" => FieldValue::Ref(self.group),
      "probekey" => FieldValue::Ref(self.probekey),
      "parent" => FieldValue::Ref(self.parent),
      "probeexecutable" => self.probeexecutable.as_deref().into(),
      "description" => self.description.as_str().into(),
      other => return self.probe_config.field(other),
    })
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
  Metric,
  Aggregation,
  Thresholds,
  Report,
}

impl ProfileKind {
  pub fn content_type(self) -> ContentType {
    match self {
      Self::Metric => ContentType::MetricProfile,
      Self::Aggregation => ContentType::AggregationProfile,
      Self::Thresholds => ContentType::ThresholdsProfile,
      Self::Report => ContentType::Report,
    }
  }

  /// Names of the fields that come from the upstream profile document rather
  /// than the local row.
  pub fn upstream_fields(self) -> impl Iterator<Item = &'static str> {
    self.content_type().schema()[LOCAL_PROFILE_FIELDS..]
      .iter()
      .map(|spec| spec.name)
  }
}

/// A locally registered profile. Only `name`, `apiid` and `groupname` live in
/// the local row; everything else is mirrored from the web API into
/// `upstream` before the profile is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub id:        Option<i64>,
  pub kind:      ProfileKind,
  pub name:      String,
  /// Identifier of the profile in the web API.
  pub apiid:     String,
  pub groupname: Option<i64>,
  #[serde(default)]
  pub upstream:  Map<String, Value>,
}

impl Profile {
  pub fn new(kind: ProfileKind, name: impl Into<String>, apiid: impl Into<String>) -> Self {
    Self {
      id: None,
      kind,
      name: name.into(),
      apiid: apiid.into(),
      groupname: None,
      upstream: Map::new(),
    }
  }
}

impl Versioned for Profile {
  fn content_type(&self) -> ContentType { self.kind.content_type() }

  fn pk(&self) -> Option<i64> { self.id }

  fn object_repr(&self) -> String { self.name.clone() }

  fn field(&self, name: &str) -> Option<FieldValue> {
    match name {
      "name" => Some(self.name.as_str().into()),
      "apiid" => Some(self.apiid.as_str().into()),
      "groupname" => Some(FieldValue::Ref(self.groupname)),
      other if self.kind.upstream_fields().any(|f| f == other) => Some(
        self
          .upstream
          .get(other)
          .cloned()
          .map_or(FieldValue::Null, FieldValue::Json),
      ),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn every_schema_field_is_answered() {
    let probe = Probe::default();
    let template = MetricTemplate::default();
    let metric = Metric::default();
    let profiles = [
      Profile::new(ProfileKind::Metric, "p", "1"),
      Profile::new(ProfileKind::Aggregation, "p", "1"),
      Profile::new(ProfileKind::Thresholds, "p", "1"),
      Profile::new(ProfileKind::Report, "p", "1"),
    ];

    let mut objects: Vec<&dyn Versioned> = vec![&probe, &template, &metric];
    objects.extend(profiles.iter().map(|p| p as &dyn Versioned));

    for obj in objects {
      for spec in obj.content_type().schema() {
        assert!(
          obj.field(spec.name).is_some(),
          "{} does not answer {:?}",
          obj.content_type(),
          spec.name
        );
      }
      assert!(obj.field("not_a_field").is_none());
    }
  }

  #[test]
  fn probe_repr_includes_version() {
    let probe = Probe {
      name: "check_http".into(),
      version: "2.1".into(),
      ..Default::default()
    };
    assert_eq!(probe.object_repr(), "check_http (2.1)");
  }

  #[test]
  fn profile_upstream_fields_depend_on_kind() {
    let mut profile = Profile::new(ProfileKind::Aggregation, "critical", "abc");
    profile
      .upstream
      .insert("metric_operation".into(), json!("AND"));

    assert_eq!(
      profile.field("metric_operation"),
      Some(FieldValue::Json(json!("AND")))
    );
    assert_eq!(profile.field("endpoint_group"), Some(FieldValue::Null));
    // Thresholds rules are not part of an aggregation profile.
    assert_eq!(profile.field("rules"), None);
  }
}
