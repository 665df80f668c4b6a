//! Explicit per-entity field schemas.
//!
//! Every versioned entity type has a fixed, ordered list of persisted fields.
//! The snapshot producer walks this list instead of introspecting the entity,
//! and the backfill job uses it to find which fields embed a given kind of
//! natural key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Content types ───────────────────────────────────────────────────────────

/// The kind of object a history series belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
  Probe,
  MetricTemplate,
  Metric,
  MetricProfile,
  AggregationProfile,
  ThresholdsProfile,
  Report,
}

impl ContentType {
  pub const ALL: [ContentType; 7] = [
    Self::Probe,
    Self::MetricTemplate,
    Self::Metric,
    Self::MetricProfile,
    Self::AggregationProfile,
    Self::ThresholdsProfile,
    Self::Report,
  ];

  /// The `<app>.<model>` label written into the `model` key of a snapshot and
  /// into the `content_type` column.
  pub fn label(self) -> &'static str {
    match self {
      Self::Probe => "poem_super_admin.probe",
      Self::MetricTemplate => "poem_super_admin.metrictemplate",
      Self::Metric => "poem.metric",
      Self::MetricProfile => "poem.metricprofiles",
      Self::AggregationProfile => "poem.aggregation",
      Self::ThresholdsProfile => "poem.thresholdsprofiles",
      Self::Report => "poem.reports",
    }
  }

  pub fn from_label(label: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|ct| ct.label() == label)
      .ok_or_else(|| Error::UnknownContentType(label.to_owned()))
  }

  /// The ordered list of persisted fields for this content type.
  pub fn schema(self) -> &'static [FieldSpec] {
    match self {
      Self::Probe => PROBE_FIELDS,
      Self::MetricTemplate => METRIC_TEMPLATE_FIELDS,
      Self::Metric => METRIC_FIELDS,
      Self::MetricProfile => METRIC_PROFILE_FIELDS,
      Self::AggregationProfile => AGGREGATION_PROFILE_FIELDS,
      Self::ThresholdsProfile => THRESHOLDS_PROFILE_FIELDS,
      Self::Report => REPORT_FIELDS,
    }
  }

  pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
    self.schema().iter().find(|spec| spec.name == name)
  }

  /// Fields of this content type whose stored value embeds natural keys of
  /// `target`, either directly or as list elements.
  pub fn relation_fields(
    self,
    target: RelationTarget,
  ) -> impl Iterator<Item = &'static FieldSpec> {
    self
      .schema()
      .iter()
      .filter(move |spec| spec.kind.target() == Some(target))
  }
}

impl fmt::Display for ContentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

// ─── Relation targets ────────────────────────────────────────────────────────

/// The kind of live row a relation field points at.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationTarget {
  /// A probe package, identified by `(name, version)`.
  Package,
  /// One released version of a probe, identified by `(name, version)`.
  ProbeVersion,
  MetricTemplateType,
  MetricType,
  MetricTag,
  /// The tenant group owning metrics and profiles.
  Group,
  MetricTemplate,
  Metric,
}

impl RelationTarget {
  /// Number of components in this target's natural key.
  pub fn arity(self) -> usize {
    match self {
      Self::Package | Self::ProbeVersion => 2,
      _ => 1,
    }
  }

  fn as_str(self) -> &'static str {
    match self {
      Self::Package => "package",
      Self::ProbeVersion => "probe version",
      Self::MetricTemplateType => "metric template type",
      Self::MetricType => "metric type",
      Self::MetricTag => "metric tag",
      Self::Group => "group",
      Self::MetricTemplate => "metric template",
      Self::Metric => "metric",
    }
  }
}

impl fmt::Display for RelationTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Field specs ─────────────────────────────────────────────────────────────

/// How a field is represented in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Integer,
  Boolean,
  /// Free-form structured data stored as-is.
  Json,
  /// A single foreign key, stored as the target's natural-key list.
  Relation(RelationTarget),
  /// A many-to-many relation, stored as a list of natural-key lists.
  ManyRelation(RelationTarget),
}

impl FieldKind {
  pub fn target(self) -> Option<RelationTarget> {
    match self {
      Self::Relation(t) | Self::ManyRelation(t) => Some(t),
      _ => None,
    }
  }

  pub fn describe(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Integer => "integer",
      Self::Boolean => "boolean",
      Self::Json => "json",
      Self::Relation(_) => "relation",
      Self::ManyRelation(_) => "many-relation",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub kind: FieldKind,
}

impl FieldSpec {
  const fn new(name: &'static str, kind: FieldKind) -> Self { Self { name, kind } }

  const fn text(name: &'static str) -> Self { Self::new(name, FieldKind::Text) }

  const fn json(name: &'static str) -> Self { Self::new(name, FieldKind::Json) }

  const fn relation(name: &'static str, target: RelationTarget) -> Self {
    Self::new(name, FieldKind::Relation(target))
  }

  const fn many(name: &'static str, target: RelationTarget) -> Self {
    Self::new(name, FieldKind::ManyRelation(target))
  }
}

// ─── Schemas ─────────────────────────────────────────────────────────────────

const PROBE_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::text("version"),
  FieldSpec::relation("package", RelationTarget::Package),
  FieldSpec::text("description"),
  FieldSpec::text("comment"),
  FieldSpec::text("repository"),
  FieldSpec::text("docurl"),
];

const METRIC_TEMPLATE_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::relation("mtype", RelationTarget::MetricTemplateType),
  FieldSpec::relation("probekey", RelationTarget::ProbeVersion),
  FieldSpec::relation("parent", RelationTarget::MetricTemplate),
  FieldSpec::text("probeexecutable"),
  FieldSpec::json("config"),
  FieldSpec::json("attribute"),
  FieldSpec::json("dependency"),
  FieldSpec::json("flags"),
  FieldSpec::json("files"),
  FieldSpec::json("parameter"),
  FieldSpec::json("fileparameter"),
  FieldSpec::many("tags", RelationTarget::MetricTag),
  FieldSpec::text("description"),
];

const METRIC_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::relation("mtype", RelationTarget::MetricType),
  FieldSpec::relation("group", RelationTarget::Group),
  FieldSpec::relation("probekey", RelationTarget::ProbeVersion),
  FieldSpec::relation("parent", RelationTarget::Metric),
  FieldSpec::text("probeexecutable"),
  FieldSpec::json("config"),
  FieldSpec::json("attribute"),
  FieldSpec::json("dependency"),
  FieldSpec::json("flags"),
  FieldSpec::json("files"),
  FieldSpec::json("parameter"),
  FieldSpec::json("fileparameter"),
  FieldSpec::text("description"),
];

// Profiles share `name`, `apiid` and `groupname`; the remaining fields come
// from the upstream web API document.

const METRIC_PROFILE_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::text("apiid"),
  FieldSpec::relation("groupname", RelationTarget::Group),
  FieldSpec::json("description"),
  FieldSpec::json("services"),
];

const AGGREGATION_PROFILE_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::text("apiid"),
  FieldSpec::relation("groupname", RelationTarget::Group),
  FieldSpec::json("endpoint_group"),
  FieldSpec::json("metric_operation"),
  FieldSpec::json("profile_operation"),
  FieldSpec::json("metric_profile"),
  FieldSpec::json("groups"),
];

const THRESHOLDS_PROFILE_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::text("apiid"),
  FieldSpec::relation("groupname", RelationTarget::Group),
  FieldSpec::json("rules"),
];

const REPORT_FIELDS: &[FieldSpec] = &[
  FieldSpec::text("name"),
  FieldSpec::text("apiid"),
  FieldSpec::relation("groupname", RelationTarget::Group),
  FieldSpec::json("description"),
  FieldSpec::json("topology_schema"),
  FieldSpec::json("thresholds"),
  FieldSpec::json("profiles"),
  FieldSpec::json("filter_tags"),
];

/// Number of leading profile fields that live in the local row.
pub(crate) const LOCAL_PROFILE_FIELDS: usize = 3;
