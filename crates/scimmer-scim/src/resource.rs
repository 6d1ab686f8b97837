//! User and group resources plus the PATCH message.

use scimmer_core::{Group, Identity};
use serde::{Deserialize, Serialize};

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:           Option<String>,
  #[serde(default)]
  pub schemas:      Vec<String>,
  pub user_name:    String,
  #[serde(default)]
  pub display_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub external_id:  Option<String>,
  #[serde(default)]
  pub active:       bool,
  #[serde(default)]
  pub name:         ScimName,
  #[serde(default)]
  pub emails:       Vec<ScimEmail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
  #[serde(default)]
  pub given_name:  String,
  #[serde(default)]
  pub family_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimEmail {
  pub value:   String,
  #[serde(default, rename = "type")]
  pub kind:    String,
  #[serde(default)]
  pub primary: bool,
}

impl From<&Identity> for ScimUser {
  fn from(identity: &Identity) -> Self {
    let emails = if identity.email.is_empty() {
      vec![]
    } else {
      vec![ScimEmail {
        value:   identity.email.clone(),
        kind:    "work".into(),
        primary: true,
      }]
    };

    Self {
      id: identity.remote_id.clone(),
      schemas: vec![USER_SCHEMA.into()],
      user_name: identity.username.clone(),
      display_name: identity.display_name(),
      external_id: Some(identity.source_key.clone()),
      active: identity.active,
      name: ScimName {
        given_name:  identity.first_name.clone(),
        family_name: identity.last_name.clone(),
      },
      emails,
    }
  }
}

// ─── Group ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:           Option<String>,
  #[serde(default)]
  pub schemas:      Vec<String>,
  #[serde(default)]
  pub display_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub external_id:  Option<String>,
  #[serde(default)]
  pub members:      Vec<ScimMember>,
}

/// A member reference: a remote id, or a `bulkId:` forward reference inside
/// a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimMember {
  pub value:   String,
  #[serde(default, rename = "$ref", skip_serializing_if = "Option::is_none")]
  pub reference: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display: Option<String>,
}

impl ScimMember {
  pub fn new(value: impl Into<String>) -> Self {
    Self { value: value.into(), reference: None, display: None }
  }
}

impl ScimGroup {
  /// Build the wire group for `group` with already-translated member values.
  pub fn new(group: &Group, member_values: Vec<String>) -> Self {
    Self {
      id:           group.remote_id.clone(),
      schemas:      vec![GROUP_SCHEMA.into()],
      display_name: group.display_name.clone(),
      external_id:  Some(group.source_key.clone()),
      members:      member_values.into_iter().map(ScimMember::new).collect(),
    }
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
  pub schemas:    Vec<String>,
  #[serde(rename = "Operations")]
  pub operations: Vec<PatchOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
  pub op:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
}

impl PatchRequest {
  /// Replace the complete member list of a group.
  ///
  /// Groups cannot be replaced wholesale, so this is the only update the
  /// engine sends for a group.
  pub fn replace_members(members: &[ScimMember]) -> crate::Result<Self> {
    Ok(Self {
      schemas:    vec![PATCH_OP_SCHEMA.into()],
      operations: vec![PatchOperation {
        op:    "replace".into(),
        path:  Some("members".into()),
        value: Some(serde_json::to_value(members)?),
      }],
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn user_from_identity() {
    let mut identity =
      Identity::new("uid=ada", "Ada", "Lovelace", "ada", "ada@example.com");
    identity.active = false;

    let value = serde_json::to_value(ScimUser::from(&identity)).unwrap();
    assert_eq!(
      value,
      json!({
        "schemas": [USER_SCHEMA],
        "userName": "ada",
        "displayName": "Ada Lovelace",
        "externalId": "uid=ada",
        "active": false,
        "name": { "givenName": "Ada", "familyName": "Lovelace" },
        "emails": [{ "value": "ada@example.com", "type": "work", "primary": true }]
      })
    );
  }

  #[test]
  fn user_carries_remote_id_when_known() {
    let mut identity = Identity::new("k", "A", "B", "ab", "");
    identity.remote_id = Some("r-9".into());
    let user = ScimUser::from(&identity);
    assert_eq!(user.id.as_deref(), Some("r-9"));
    assert!(user.emails.is_empty());
  }

  #[test]
  fn minimal_user_response_parses() {
    let user: ScimUser =
      serde_json::from_value(json!({ "id": "r-1", "userName": "ada", "meta": {} }))
        .unwrap();
    assert_eq!(user.id.as_deref(), Some("r-1"));
  }

  #[test]
  fn replace_members_payload() {
    let patch =
      PatchRequest::replace_members(&[ScimMember::new("123"), ScimMember::new("234")])
        .unwrap();
    assert_eq!(
      serde_json::to_value(&patch).unwrap(),
      json!({
        "schemas": [PATCH_OP_SCHEMA],
        "Operations": [{
          "op": "replace",
          "path": "members",
          "value": [{ "value": "123" }, { "value": "234" }]
        }]
      })
    );
  }

  #[test]
  fn replace_with_no_members_sends_empty_array() {
    let patch = PatchRequest::replace_members(&[]).unwrap();
    let value = serde_json::to_value(&patch).unwrap();
    assert_eq!(value["Operations"][0]["value"], json!([]));
  }
}
