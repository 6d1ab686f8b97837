//! Bulk request and response messages (RFC 7644 §3.7).

use serde::{Deserialize, Serialize};

use crate::resource::{ScimGroup, ScimUser};

pub const BULK_REQUEST_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:BulkRequest";

/// Prefix that turns a bulk id into a forward reference.
pub const BULK_REFERENCE_PREFIX: &str = "bulkId:";

/// `bulkId:<id>` refers to the resource created by another operation in
/// the same request.
pub fn bulk_reference(bulk_id: &str) -> String { format!("{BULK_REFERENCE_PREFIX}{bulk_id}") }

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
  pub schemas:        Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fail_on_errors: Option<u32>,
  #[serde(rename = "Operations")]
  pub operations:     Vec<BulkOperation>,
}

impl Default for BulkRequest {
  fn default() -> Self {
    Self {
      schemas:        vec![BULK_REQUEST_SCHEMA.into()],
      fail_on_errors: None,
      operations:     vec![],
    }
  }
}

impl BulkRequest {
  pub fn is_empty(&self) -> bool { self.operations.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
  pub method:  String,
  pub path:    String,
  pub bulk_id: String,
  pub data:    serde_json::Value,
}

impl BulkOperation {
  pub fn create_user(bulk_id: impl Into<String>, user: &ScimUser) -> crate::Result<Self> {
    Ok(Self {
      method:  "POST".into(),
      path:    "/Users".into(),
      bulk_id: bulk_id.into(),
      data:    serde_json::to_value(user)?,
    })
  }

  pub fn create_group(bulk_id: impl Into<String>, group: &ScimGroup) -> crate::Result<Self> {
    Ok(Self {
      method:  "POST".into(),
      path:    "/Groups".into(),
      bulk_id: bulk_id.into(),
      data:    serde_json::to_value(group)?,
    })
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
  #[serde(default)]
  pub schemas:    Vec<String>,
  #[serde(default, rename = "Operations")]
  pub operations: Vec<BulkOperationResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResult {
  #[serde(default)]
  pub method:   Option<String>,
  #[serde(default)]
  pub bulk_id:  Option<String>,
  #[serde(default)]
  pub location: Option<String>,
  /// Servers disagree on whether this is a string (`"201"`) or a number.
  pub status:   serde_json::Value,
  #[serde(default)]
  pub response: Option<serde_json::Value>,
}

impl BulkOperationResult {
  pub fn status_code(&self) -> Option<u16> {
    match &self.status {
      serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
      serde_json::Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.status_code().is_some_and(|s| (200..300).contains(&s))
  }

  /// The id of the created resource: the last segment of `location`, or the
  /// `id` of an embedded response.
  pub fn remote_id(&self) -> Option<String> {
    self
      .location
      .as_deref()
      .and_then(|l| l.trim_end_matches('/').rsplit('/').next())
      .filter(|s| !s.is_empty())
      .map(str::to_owned)
      .or_else(|| {
        self
          .response
          .as_ref()
          .and_then(|r| r.get("id"))
          .and_then(|id| id.as_str())
          .map(str::to_owned)
      })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn request_uses_rfc_field_names() {
    let request = BulkRequest::default();
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value, json!({ "schemas": [BULK_REQUEST_SCHEMA], "Operations": [] }));
  }

  #[test]
  fn response_status_as_string_or_number() {
    let response: BulkResponse = serde_json::from_value(json!({
      "schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkResponse"],
      "Operations": [
        { "method": "POST", "bulkId": "a", "location": "https://x/Users/92b7", "status": "201" },
        { "method": "POST", "bulkId": "b", "status": 409, "response": { "detail": "exists" } }
      ]
    }))
    .unwrap();

    let ok = &response.operations[0];
    assert_eq!(ok.status_code(), Some(201));
    assert!(ok.is_success());
    assert_eq!(ok.remote_id().as_deref(), Some("92b7"));

    let failed = &response.operations[1];
    assert_eq!(failed.status_code(), Some(409));
    assert!(!failed.is_success());
    assert!(failed.remote_id().is_none());
  }

  #[test]
  fn remote_id_falls_back_to_embedded_response() {
    let result = BulkOperationResult {
      method:   None,
      bulk_id:  Some("a".into()),
      location: None,
      status:   json!("201"),
      response: Some(json!({ "id": "r-5" })),
    };
    assert_eq!(result.remote_id().as_deref(), Some("r-5"));
  }
}
