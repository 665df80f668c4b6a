//! Profile definitions mirrored from the external web API.
//!
//! Only `name`, `apiid` and `groupname` of a profile live locally; fields such
//! as `endpoint_group` or `metric_operation` exist only upstream and are
//! copied into the profile before it is recorded.

use std::{collections::HashMap, future::Future, time::Duration};

use poem_core::{
  entity::{Profile, ProfileKind},
  history::Tenant,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{Result, config::WebApiConfig};

/// A source of upstream profile documents.
pub trait ProfileSource: Send + Sync {
  /// Fetch the document for profile `apiid` of `kind` in `tenant`.
  ///
  /// `Ok(None)` means the document is unavailable (unknown profile, or no
  /// credentials for the tenant); callers skip enrichment in that case.
  fn fetch<'a>(
    &'a self,
    tenant: &'a Tenant,
    kind: ProfileKind,
    apiid: &'a str,
  ) -> impl Future<Output = Result<Option<Map<String, Value>>>> + Send + 'a;
}

// ─── Web API client ──────────────────────────────────────────────────────────

/// [`ProfileSource`] backed by the ARGO web API.
#[derive(Clone)]
pub struct WebApiClient {
  http:     reqwest::Client,
  base_url: String,
  tokens:   HashMap<String, String>,
}

#[derive(Deserialize)]
struct ApiResponse {
  #[serde(default)]
  data: Vec<Map<String, Value>>,
}

impl WebApiClient {
  pub fn new(config: &WebApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_owned(),
      tokens: config.tokens.clone(),
    })
  }

  fn url(&self, kind: ProfileKind, apiid: &str) -> String {
    let collection = match kind {
      ProfileKind::Metric => "metric_profiles",
      ProfileKind::Aggregation => "aggregation_profiles",
      ProfileKind::Thresholds => "thresholds_profiles",
      ProfileKind::Report => "reports",
    };
    format!("{}/api/v2/{collection}/{apiid}", self.base_url)
  }
}

impl ProfileSource for WebApiClient {
  async fn fetch<'a>(
    &'a self,
    tenant: &'a Tenant,
    kind: ProfileKind,
    apiid: &'a str,
  ) -> Result<Option<Map<String, Value>>> {
    let Some(token) = self.tokens.get(tenant.as_str()) else {
      warn!(%tenant, "no web api token configured; skipping");
      return Ok(None);
    };

    let url = self.url(kind, apiid);
    let response = self
      .http
      .get(&url)
      .header("x-api-key", token)
      .header("Accept", "application/json")
      .send()
      .await?;

    if response.status() == StatusCode::NOT_FOUND {
      debug!(%tenant, %url, "profile not found upstream");
      return Ok(None);
    }

    let body: ApiResponse = response.error_for_status()?.json().await?;
    Ok(body.data.into_iter().next())
  }
}

// ─── Enrichment ──────────────────────────────────────────────────────────────

/// Where `field` lives in an upstream document of `kind`.
fn upstream_value(doc: &Map<String, Value>, kind: ProfileKind, field: &str) -> Option<Value> {
  match (kind, field) {
    (ProfileKind::Report, "description") => {
      doc.get("info").and_then(|info| info.get("description")).cloned()
    }
    _ => doc.get(field).cloned(),
  }
}

/// Replace the upstream fields of `profile` with the current upstream
/// document. Returns `false`, leaving the profile untouched, if no document is
/// available.
pub async fn enrich_profile<P>(
  source: &P,
  tenant: &Tenant,
  profile: &mut Profile,
) -> Result<bool>
where
  P: ProfileSource,
{
  let Some(doc) = source.fetch(tenant, profile.kind, &profile.apiid).await? else {
    debug!(%tenant, apiid = %profile.apiid, "no upstream document; profile not enriched");
    return Ok(false);
  };

  for field in profile.kind.upstream_fields() {
    match upstream_value(&doc, profile.kind, field) {
      Some(value) => {
        profile.upstream.insert(field.to_owned(), value);
      }
      None => {
        profile.upstream.remove(field);
      }
    }
  }
  Ok(true)
}
