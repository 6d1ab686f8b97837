//! Async HTTP client for a SCIM 2.0 endpoint.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
  Error, Result,
  bulk::{BulkRequest, BulkResponse},
  resource::{PatchRequest, ScimGroup, ScimUser},
};

const CONTENT_TYPE: &str = "application/scim+json";

/// Connection settings for a SCIM endpoint.
#[derive(Debug, Clone)]
pub struct ScimConfig {
  /// Base URL, e.g. `https://idm.example.com/scim/v2`.
  pub endpoint_url: String,
  /// Bearer token sent with every request.
  pub token:        String,
  /// Per-request timeout.
  pub timeout:      Duration,
}

/// Subset of `ServiceProviderConfig` (RFC 7643 §5) the engine cares about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
  #[serde(default)]
  pub patch: FeatureSupport,
  #[serde(default)]
  pub bulk:  BulkSupport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSupport {
  #[serde(default)]
  pub supported: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
  #[serde(default)]
  pub supported:        bool,
  #[serde(default)]
  pub max_operations:   u64,
  #[serde(default)]
  pub max_payload_size: u64,
}

/// Async client for the SCIM endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ScimClient {
  client:   Client,
  base_url: String,
  token:    String,
}

impl ScimClient {
  pub fn new(config: ScimConfig) -> Result<Self> {
    if config.endpoint_url.trim().is_empty() {
      return Err(Error::InvalidConfig("endpoint url is empty".into()));
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("scimmer/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      client,
      base_url: config.endpoint_url.trim_end_matches('/').to_string(),
      token: config.token,
    })
  }

  fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

  // ── Discovery ─────────────────────────────────────────────────────────────

  /// `GET /ServiceProviderConfig`
  pub async fn service_provider_config(&self) -> Result<ServiceProviderConfig> {
    self
      .send::<(), _>(Method::GET, "/ServiceProviderConfig", None)
      .await?
      .ok_or_else(|| empty_body("/ServiceProviderConfig"))
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  /// `POST /Users`
  pub async fn create_user(&self, user: &ScimUser) -> Result<ScimUser> {
    self
      .send(Method::POST, "/Users", Some(user))
      .await?
      .ok_or_else(|| empty_body("/Users"))
  }

  /// `PUT /Users/{id}`
  pub async fn replace_user(&self, id: &str, user: &ScimUser) -> Result<Option<ScimUser>> {
    self.send(Method::PUT, &format!("/Users/{id}"), Some(user)).await
  }

  /// `DELETE /Users/{id}`
  pub async fn delete_user(&self, id: &str) -> Result<()> {
    self
      .send::<(), serde_json::Value>(Method::DELETE, &format!("/Users/{id}"), None)
      .await
      .map(|_| ())
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  /// `POST /Groups`
  pub async fn create_group(&self, group: &ScimGroup) -> Result<ScimGroup> {
    self
      .send(Method::POST, "/Groups", Some(group))
      .await?
      .ok_or_else(|| empty_body("/Groups"))
  }

  /// `PATCH /Groups/{id}`. Most servers answer `204 No Content`.
  pub async fn patch_group(
    &self,
    id: &str,
    patch: &PatchRequest,
  ) -> Result<Option<ScimGroup>> {
    self.send(Method::PATCH, &format!("/Groups/{id}"), Some(patch)).await
  }

  // ── Bulk ──────────────────────────────────────────────────────────────────

  /// `POST /Bulk`
  pub async fn bulk(&self, request: &BulkRequest) -> Result<BulkResponse> {
    self
      .send(Method::POST, "/Bulk", Some(request))
      .await
      .map(Option::unwrap_or_default)
  }

  // ── Transport ─────────────────────────────────────────────────────────────

  /// Send one request; `Ok(None)` for `204` or an empty body.
  async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Option<T>>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    tracing::debug!("SCIM {method} {path}");

    let mut request = self
      .client
      .request(method.clone(), self.url(path))
      .bearer_auth(&self.token)
      .header(header::ACCEPT, CONTENT_TYPE);
    if let Some(body) = body {
      request = request
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .body(serde_json::to_vec(body)?);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
      return Err(Error::Rejected {
        status: status.as_u16(),
        body:   String::from_utf8_lossy(&bytes).into_owned(),
      });
    }

    if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
  }
}

/// A success status whose body should have carried the resource.
fn empty_body(path: &str) -> Error {
  Error::Serialization(serde::de::Error::custom(format!(
    "empty response body from {path}"
  )))
}
