//! The explicit "save, then append snapshot" write path.

use std::sync::Arc;

use poem_core::{
  comment,
  entity::{Profile, Versioned},
  history::{HistoryEntry, NewHistoryEntry, Tenant},
  natural_key::ReferenceResolver,
  schema::ContentType,
  snapshot::{DanglingPolicy, FieldMap, snapshot_of},
  store::HistoryStore,
};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  upstream::{ProfileSource, enrich_profile},
};

/// Appends one history entry per domain-object save.
///
/// The caller saves the object first and then calls [`record`]; both should
/// run inside the caller's persistence transaction.
///
/// [`record`]: HistoryRecorder::record
pub struct HistoryRecorder<S, R> {
  store:    Arc<S>,
  resolver: Arc<R>,
  dangling: DanglingPolicy,
}

impl<S, R> HistoryRecorder<S, R>
where
  S: HistoryStore,
  R: ReferenceResolver,
{
  pub fn new(store: Arc<S>, resolver: Arc<R>) -> Self {
    Self {
      store,
      resolver,
      dangling: DanglingPolicy::default(),
    }
  }

  pub fn with_dangling_policy(mut self, policy: DanglingPolicy) -> Self {
    self.dangling = policy;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  /// Snapshot `entity` as just saved by `user` and append it to its series.
  ///
  /// The first entry of a series carries
  /// [`INITIAL_VERSION`](comment::INITIAL_VERSION); later ones describe the
  /// field changes against the newest stored entry. If that entry cannot be
  /// decoded it is logged and every field is described as added.
  pub async fn record<E>(&self, tenant: &Tenant, entity: &E, user: &str) -> Result<HistoryEntry>
  where
    E: Versioned + ?Sized,
  {
    let content_type = entity.content_type();
    let pk = entity
      .pk()
      .ok_or(poem_core::Error::UnsavedObject(content_type))?;
    let object_id = pk.to_string();

    let latest = self
      .store
      .latest(tenant, &object_id, content_type)
      .await
      .map_err(Error::store)?;
    let previous: Option<FieldMap> = match &latest {
      None => None,
      Some(newest) => match newest.snapshot() {
        Ok(snap) => Some(snap.fields),
        Err(e) => {
          warn!(
            %tenant,
            %content_type,
            %object_id,
            entry_id = newest.id,
            error = %e,
            "newest history entry is unreadable; diffing against an empty snapshot"
          );
          Some(FieldMap::new())
        }
      },
    };
    let previous_fields = previous.as_ref();

    let snapshot = snapshot_of(entity, &*self.resolver, self.dangling, previous_fields)?;
    let comment = comment::comment(previous_fields, &snapshot.fields);

    let entry = self
      .store
      .append(tenant, NewHistoryEntry {
        object_id,
        content_type,
        object_repr: entity.object_repr(),
        serialized_data: snapshot.encode()?,
        comment,
        user: user.to_owned(),
      })
      .await
      .map_err(Error::store)?;

    debug!(
      %tenant,
      %content_type,
      object_id = %entry.object_id,
      entry_id = entry.id,
      initial = previous.is_none(),
      "recorded history entry"
    );
    Ok(entry)
  }

  /// Refresh `profile` from the web API, then record it.
  ///
  /// If the upstream document is unavailable the profile is recorded with the
  /// upstream fields it already carries.
  pub async fn record_profile<P>(
    &self,
    tenant: &Tenant,
    source: &P,
    profile: &mut Profile,
    user: &str,
  ) -> Result<HistoryEntry>
  where
    P: ProfileSource,
  {
    enrich_profile(source, tenant, profile).await?;
    self.record(tenant, &*profile, user).await
  }

  /// The history of one object, newest first.
  pub async fn history(
    &self,
    tenant: &Tenant,
    content_type: ContentType,
    object_id: &str,
  ) -> Result<Vec<HistoryEntry>> {
    self
      .store
      .list(tenant, object_id, content_type)
      .await
      .map_err(Error::store)
  }
}
