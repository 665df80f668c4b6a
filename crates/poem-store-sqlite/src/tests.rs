//! Integration tests for `SqliteHistoryStore` against an in-memory database.

use chrono::{TimeDelta, Utc};
use poem_core::{
  history::{NewHistoryEntry, Tenant},
  schema::ContentType,
  store::HistoryStore,
};

use crate::{SqliteHistoryStore, encode::encode_dt};

async fn store() -> SqliteHistoryStore {
  SqliteHistoryStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn store_with(tenants: &[&str]) -> SqliteHistoryStore {
  let s = store().await;
  for t in tenants {
    s.register_tenant(&Tenant::new(*t)).await.unwrap();
  }
  s
}

fn entry(object_id: &str, content_type: ContentType, data: &str, comment: &str) -> NewHistoryEntry {
  NewHistoryEntry {
    object_id:       object_id.into(),
    content_type,
    object_repr:     format!("object {object_id}"),
    serialized_data: data.into(),
    comment:         comment.into(),
    user:            "poem".into(),
  }
}

// ─── Tenants ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_tenant_is_idempotent() {
  let s = store().await;
  let t = Tenant::new("egi");

  s.register_tenant(&t).await.unwrap();
  s.register_tenant(&t).await.unwrap();
  s.register_tenant(&Tenant::public()).await.unwrap();

  let tenants = s.list_tenants().await.unwrap();
  assert_eq!(tenants, vec![Tenant::new("egi"), Tenant::public()]);
}

#[tokio::test]
async fn append_to_unknown_tenant_errors() {
  let s = store().await;
  let err = s
    .append(&Tenant::new("ghost"), entry("1", ContentType::Metric, "[]", "x"))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::UnknownTenant(ref t) if t == "ghost"));
}

// ─── Append and read ─────────────────────────────────────────────────────────

#[tokio::test]
async fn append_and_latest() {
  let s = store_with(&["egi"]).await;
  let t = Tenant::new("egi");

  assert!(s.latest(&t, "1", ContentType::Metric).await.unwrap().is_none());

  let first = s
    .append(&t, entry("1", ContentType::Metric, "[1]", "Initial version."))
    .await
    .unwrap();
  let second = s
    .append(&t, entry("1", ContentType::Metric, "[2]", "changed"))
    .await
    .unwrap();

  assert!(second.id > first.id);
  assert!(second.date_created >= first.date_created);

  let latest = s.latest(&t, "1", ContentType::Metric).await.unwrap().unwrap();
  assert_eq!(latest, second);
  assert_eq!(latest.tenant, t);
  assert_eq!(latest.object_repr, "object 1");
}

#[tokio::test]
async fn list_is_newest_first() {
  let s = store_with(&["egi"]).await;
  let t = Tenant::new("egi");

  let mut ids = vec![];
  for n in 0..5 {
    let e = s
      .append(&t, entry("7", ContentType::MetricTemplate, &format!("[{n}]"), "c"))
      .await
      .unwrap();
    ids.push(e.id);
  }

  let listed: Vec<i64> = s
    .list(&t, "7", ContentType::MetricTemplate)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.id)
    .collect();

  ids.reverse();
  assert_eq!(listed, ids);
}

#[tokio::test]
async fn clock_regression_is_clamped_to_newest_in_series() {
  let s = store_with(&["egi"]).await;
  let t = Tenant::new("egi");

  // An entry written while the clock was a day ahead.
  let ahead = encode_dt(Utc::now() + TimeDelta::days(1));
  let planted = ahead.clone();
  let planted_id: i64 = s
    .conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO history (
           tenant, object_id, content_type, object_repr,
           serialized_data, date_created, comment, user
         ) VALUES ('egi', '1', 'poem.metric', 'm', '[]', ?1, 'Initial version.', 'poem')",
        rusqlite::params![planted],
      )?;
      Ok(conn.last_insert_rowid())
    })
    .await
    .unwrap();

  let appended = s
    .append(&t, entry("1", ContentType::Metric, "[2]", "changed"))
    .await
    .unwrap();
  assert_eq!(encode_dt(appended.date_created), ahead);

  let listed: Vec<i64> = s
    .list(&t, "1", ContentType::Metric)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.id)
    .collect();
  assert_eq!(listed, vec![appended.id, planted_id]);

  // Other series keep the real clock.
  let other = s
    .append(&t, entry("2", ContentType::Metric, "[]", "c"))
    .await
    .unwrap();
  assert!(encode_dt(other.date_created) < ahead);
}

#[tokio::test]
async fn series_are_keyed_by_object_and_content_type() {
  let s = store_with(&["egi"]).await;
  let t = Tenant::new("egi");

  s.append(&t, entry("1", ContentType::Metric, "[]", "a")).await.unwrap();
  s.append(&t, entry("1", ContentType::MetricTemplate, "[]", "b")).await.unwrap();
  s.append(&t, entry("2", ContentType::Metric, "[]", "c")).await.unwrap();

  let metric_1 = s.list(&t, "1", ContentType::Metric).await.unwrap();
  assert_eq!(metric_1.len(), 1);
  assert_eq!(metric_1[0].comment, "a");

  let template_1 = s.list(&t, "1", ContentType::MetricTemplate).await.unwrap();
  assert_eq!(template_1.len(), 1);
  assert_eq!(template_1[0].comment, "b");
}

#[tokio::test]
async fn tenants_are_isolated() {
  let s = store_with(&["egi", "eudat"]).await;
  let egi = Tenant::new("egi");
  let eudat = Tenant::new("eudat");

  s.append(&egi, entry("1", ContentType::Metric, "[]", "egi")).await.unwrap();

  assert!(s.list(&eudat, "1", ContentType::Metric).await.unwrap().is_empty());
  assert!(s.latest(&eudat, "1", ContentType::Metric).await.unwrap().is_none());
  assert!(
    s.entries_of_type(&eudat, ContentType::Metric)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn entries_of_type_is_oldest_first() {
  let s = store_with(&["egi"]).await;
  let t = Tenant::new("egi");

  let a = s.append(&t, entry("1", ContentType::Metric, "[]", "a")).await.unwrap();
  let b = s.append(&t, entry("2", ContentType::Metric, "[]", "b")).await.unwrap();
  s.append(&t, entry("3", ContentType::Probe, "[]", "p")).await.unwrap();
  let c = s.append(&t, entry("1", ContentType::Metric, "[]", "c")).await.unwrap();

  let ids: Vec<i64> = s
    .entries_of_type(&t, ContentType::Metric)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.id)
    .collect();
  assert_eq!(ids, vec![a.id, b.id, c.id]);
}

// ─── Rewrites ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rewrite_touches_only_serialized_data() {
  let s = store_with(&["egi"]).await;
  let t = Tenant::new("egi");

  let before = s
    .append(&t, entry("1", ContentType::Metric, "[\"old\"]", "Initial version."))
    .await
    .unwrap();

  let n = s
    .rewrite_serialized(&t, vec![(before.id, "[\"new\"]".into())])
    .await
    .unwrap();
  assert_eq!(n, 1);

  let after = s.latest(&t, "1", ContentType::Metric).await.unwrap().unwrap();
  assert_eq!(after.serialized_data, "[\"new\"]");
  assert_eq!(after.id, before.id);
  assert_eq!(after.date_created, before.date_created);
  assert_eq!(after.comment, before.comment);
  assert_eq!(after.user, before.user);
  assert_eq!(after.object_repr, before.object_repr);
}

#[tokio::test]
async fn rewrite_is_scoped_to_tenant() {
  let s = store_with(&["egi", "eudat"]).await;
  let egi = Tenant::new("egi");

  let e = s.append(&egi, entry("1", ContentType::Metric, "[1]", "c")).await.unwrap();

  let n = s
    .rewrite_serialized(&Tenant::new("eudat"), vec![(e.id, "[2]".into())])
    .await
    .unwrap();
  assert_eq!(n, 0);

  let unchanged = s.latest(&egi, "1", ContentType::Metric).await.unwrap().unwrap();
  assert_eq!(unchanged.serialized_data, "[1]");
}

#[tokio::test]
async fn empty_rewrite_is_noop() {
  let s = store_with(&["egi"]).await;
  let n = s.rewrite_serialized(&Tenant::new("egi"), vec![]).await.unwrap();
  assert_eq!(n, 0);
}
