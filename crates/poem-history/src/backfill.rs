//! Rewriting stored snapshots after upstream natural keys change.
//!
//! When a probe is bumped to a new version, or a group is renamed, every
//! snapshot that embeds the old natural key is rewritten to the new one. Only
//! the matching relation values change; timestamps, comments, users and entry
//! ids are preserved, and entries with nothing to rewrite are never written.
//!
//! All rewrites of one job are applied together: every stored key is matched
//! against its value before the job, never against another rewrite's output.
//! Rewrites that would make a rerun move keys again (one rewrite's new key is
//! another's old key) or that send one key to two places are rejected and
//! reported, so the job stays idempotent. A chained rename is split into one
//! job per link, starting from the end of the chain (`B → C` before `A → B`).
//! The job assumes a single runner per store.

use std::collections::HashMap;

use poem_core::{
  history::Tenant,
  natural_key::{NaturalKey, ReferenceResolver},
  schema::{ContentType, FieldSpec, RelationTarget},
  store::HistoryStore,
};
use tracing::{info, warn};

use crate::{Error, Result};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Replace natural key `from` with `to` wherever a relation to `target` is
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRewrite {
  pub target: RelationTarget,
  pub from:   NaturalKey,
  pub to:     NaturalKey,
}

impl KeyRewrite {
  /// A probe moved from `old_version` to `new_version`.
  pub fn probe_version(
    name: impl Into<String>,
    old_version: impl Into<String>,
    new_version: impl Into<String>,
  ) -> Self {
    let name = name.into();
    Self {
      target: RelationTarget::ProbeVersion,
      from:   NaturalKey::name_version(name.clone(), old_version),
      to:     NaturalKey::name_version(name, new_version),
    }
  }
}

/// A live row whose natural key is about to become `new_key`. Its current key
/// is looked up when the job is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceChange {
  pub target:  RelationTarget,
  pub id:      i64,
  pub new_key: NaturalKey,
}

/// Why a [`KeyRewrite`] was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
  /// Another rewrite in the job sends the same key somewhere else.
  Conflicting,
  /// The rewrite's old key is produced, or its new key consumed, by another
  /// rewrite in the job.
  Chained,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRewrite {
  pub rewrite: KeyRewrite,
  pub reason:  RejectReason,
}

/// Old key → new key, per relation target.
type KeyMap = HashMap<RelationTarget, HashMap<NaturalKey, NaturalKey>>;

/// Split `rewrites` into the key map the job applies and the rewrites it
/// rejects. No-op and repeated rewrites are dropped silently.
fn accept_rewrites(rewrites: Vec<KeyRewrite>, rejected: &mut Vec<RejectedRewrite>) -> KeyMap {
  let mut unique: Vec<KeyRewrite> = Vec::with_capacity(rewrites.len());
  for r in rewrites {
    if r.from != r.to && !unique.contains(&r) {
      unique.push(r);
    }
  }

  let reasons: Vec<Option<RejectReason>> = unique
    .iter()
    .map(|r| {
      let same_target = || unique.iter().filter(|o| o.target == r.target);
      if same_target().any(|o| o.from == r.from && o.to != r.to) {
        Some(RejectReason::Conflicting)
      } else if same_target().any(|o| o.from == r.to || o.to == r.from) {
        Some(RejectReason::Chained)
      } else {
        None
      }
    })
    .collect();

  let mut keys = KeyMap::new();
  for (rewrite, reason) in unique.into_iter().zip(reasons) {
    match reason {
      Some(reason) => {
        warn!(
          relation = %rewrite.target,
          from = %rewrite.from,
          to = %rewrite.to,
          ?reason,
          "rejecting key rewrite"
        );
        rejected.push(RejectedRewrite { rewrite, reason });
      }
      None => {
        keys
          .entry(rewrite.target)
          .or_default()
          .insert(rewrite.from, rewrite.to);
      }
    }
  }
  keys
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// A stored entry that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
  pub tenant:       Tenant,
  pub entry_id:     i64,
  pub content_type: ContentType,
  pub error:        String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackfillReport {
  pub tenants:         Vec<Tenant>,
  /// Requested tenants that are not registered in the store.
  pub skipped_tenants: Vec<Tenant>,
  /// Reference changes whose current key could not be resolved.
  pub unresolved:      Vec<(RelationTarget, i64)>,
  /// Rewrites left out of the job; see [`RejectReason`].
  pub rejected:        Vec<RejectedRewrite>,
  pub scanned:         usize,
  pub rewritten:       usize,
  pub failures:        Vec<RecordFailure>,
}

// ─── Job ─────────────────────────────────────────────────────────────────────

pub struct BackfillJob<'s, S> {
  store:      &'s S,
  rewrites:   Vec<KeyRewrite>,
  tenants:    Option<Vec<Tenant>>,
  unresolved: Vec<(RelationTarget, i64)>,
}

impl<'s, S> BackfillJob<'s, S>
where
  S: HistoryStore,
{
  pub fn new(store: &'s S, rewrites: Vec<KeyRewrite>) -> Self {
    Self {
      store,
      rewrites,
      tenants: None,
      unresolved: Vec::new(),
    }
  }

  /// Build the rewrites from live ids, resolving each id's current key against
  /// `live` now. Ids that no longer resolve are skipped and listed in
  /// [`BackfillReport::unresolved`].
  pub fn from_reference_changes<R>(store: &'s S, changes: &[ReferenceChange], live: &R) -> Self
  where
    R: ReferenceResolver + ?Sized,
  {
    let mut job = Self::new(store, Vec::new());
    for change in changes {
      match live.resolve(change.target, change.id) {
        Ok(from) => job.rewrites.push(KeyRewrite {
          target: change.target,
          from,
          to: change.new_key.clone(),
        }),
        Err(e) => {
          warn!(relation = %change.target, id = change.id, error = %e, "skipping unresolved reference change");
          job.unresolved.push((change.target, change.id));
        }
      }
    }
    job
  }

  /// Restrict the job to `tenants`. Tenants not registered in the store are
  /// skipped.
  pub fn only_tenants(mut self, tenants: Vec<Tenant>) -> Self {
    self.tenants = Some(tenants);
    self
  }

  pub async fn run(self) -> Result<BackfillReport> {
    let mut report = BackfillReport {
      unresolved: self.unresolved,
      ..Default::default()
    };
    let keys = accept_rewrites(self.rewrites, &mut report.rejected);
    if keys.is_empty() {
      info!("backfill has nothing to rewrite");
      return Ok(report);
    }

    let registered = self.store.list_tenants().await.map_err(Error::store)?;
    let tenants = match self.tenants {
      None => registered,
      Some(wanted) => wanted
        .into_iter()
        .filter(|t| {
          let known = registered.contains(t);
          if !known {
            warn!(tenant = %t, "tenant not registered; skipping");
            report.skipped_tenants.push(t.clone());
          }
          known
        })
        .collect(),
    };

    // Relation fields per content type that some rewrite can touch.
    let plan: Vec<(ContentType, Vec<(&FieldSpec, &HashMap<NaturalKey, NaturalKey>)>)> =
      ContentType::ALL
        .into_iter()
        .map(|ct| {
          let fields = keys
            .iter()
            .flat_map(|(target, map)| ct.relation_fields(*target).map(move |spec| (spec, map)))
            .collect::<Vec<_>>();
          (ct, fields)
        })
        .filter(|(_, fields)| !fields.is_empty())
        .collect();

    for tenant in tenants {
      let mut pending: Vec<(i64, String)> = Vec::new();

      for (content_type, fields) in &plan {
        let entries = self
          .store
          .entries_of_type(&tenant, *content_type)
          .await
          .map_err(Error::store)?;

        for entry in entries {
          report.scanned += 1;

          let rewritten = entry.snapshot().and_then(|mut snap| {
            let changed = fields
              .iter()
              .fold(false, |changed, (spec, map)| snap.rewrite_relation(spec, map) || changed);
            if changed { snap.encode().map(Some) } else { Ok(None) }
          });

          match rewritten {
            Ok(Some(data)) => pending.push((entry.id, data)),
            Ok(None) => {}
            Err(e) => {
              warn!(%tenant, entry_id = entry.id, %content_type, error = %e, "cannot rewrite history entry");
              report.failures.push(RecordFailure {
                tenant:       tenant.clone(),
                entry_id:     entry.id,
                content_type: *content_type,
                error:        e.to_string(),
              });
            }
          }
        }
      }

      let updated = self
        .store
        .rewrite_serialized(&tenant, pending)
        .await
        .map_err(Error::store)?;
      info!(%tenant, updated, "backfill rewrote history entries");

      report.rewritten += updated;
      report.tenants.push(tenant);
    }

    Ok(report)
  }
}
