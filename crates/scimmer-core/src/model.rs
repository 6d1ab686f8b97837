//! Source-side entities: identities (users) and groups.
//!
//! Both are produced by a directory adapter with every attribute filled in
//! except the remote fields (`remote_id`, `checksum`, `updated_at`), which the
//! engine attaches from the mapping store before deciding what to do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{change, mapping::MappingEntry};

fn default_active() -> bool { true }

// ─── Identity ────────────────────────────────────────────────────────────────

/// A user as read from the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  /// Distinguished source key; opaque, stable and unique.
  pub source_key: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name:  String,
  pub username:   String,
  #[serde(default)]
  pub email:      String,
  #[serde(default = "default_active")]
  pub active:     bool,

  /// Identifier assigned by the remote system; `None` until created.
  #[serde(default)]
  pub remote_id:  Option<String>,
  /// Checksum recorded at the last successful sync.
  #[serde(default)]
  pub checksum:   Option<String>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Identity {
  /// A new, active identity with no remote state.
  pub fn new(
    source_key: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    username: impl Into<String>,
    email: impl Into<String>,
  ) -> Self {
    Self {
      source_key: source_key.into(),
      first_name: first_name.into(),
      last_name:  last_name.into(),
      username:   username.into(),
      email:      email.into(),
      active:     true,
      remote_id:  None,
      checksum:   None,
      updated_at: None,
    }
  }

  /// `"<first> <last>"`, trimmed when either half is missing.
  pub fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }

  /// Checksum over the attributes that are synchronised to the remote.
  pub fn current_checksum(&self) -> String { change::identity_checksum(self) }

  /// Copy the remote fields of a prior mapping entry onto this identity.
  pub fn attach(&mut self, entry: Option<&MappingEntry>) {
    self.remote_id = entry
      .map(|e| e.remote_id.clone())
      .filter(|id| !id.is_empty());
    self.checksum = entry.map(|e| e.checksum.clone());
    self.updated_at = entry.map(|e| e.updated_at);
  }
}

// ─── Group ───────────────────────────────────────────────────────────────────

/// A group as read from the source directory.
///
/// Members are source keys of users or nested groups. They are references
/// only; translating them to remote identifiers goes through the mapping
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub source_key:   String,
  pub display_name: String,
  #[serde(default)]
  pub members:      Vec<String>,

  #[serde(default)]
  pub remote_id:    Option<String>,
  #[serde(default)]
  pub checksum:     Option<String>,
  #[serde(default)]
  pub updated_at:   Option<DateTime<Utc>>,
}

impl Group {
  pub fn new(
    source_key: impl Into<String>,
    display_name: impl Into<String>,
    members: Vec<String>,
  ) -> Self {
    Self {
      source_key: source_key.into(),
      display_name: display_name.into(),
      members,
      remote_id: None,
      checksum: None,
      updated_at: None,
    }
  }

  pub fn current_checksum(&self) -> String { change::group_checksum(self) }

  /// Copy the remote fields of a prior mapping entry onto this group.
  pub fn attach(&mut self, entry: Option<&MappingEntry>) {
    self.remote_id = entry
      .map(|e| e.remote_id.clone())
      .filter(|id| !id.is_empty());
    self.checksum = entry.map(|e| e.checksum.clone());
    self.updated_at = entry.map(|e| e.updated_at);
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn identity_deserialises_with_defaults() {
    let json = r#"{"source_key":"uid=alice,dc=example,dc=org","username":"alice"}"#;
    let identity: Identity = serde_json::from_str(json).unwrap();
    assert!(identity.active);
    assert!(identity.remote_id.is_none());
    assert_eq!(identity.display_name(), "");
  }

  #[test]
  fn attach_copies_remote_fields() {
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let entry = MappingEntry {
      remote_id:  "abc".into(),
      checksum:   "c1".into(),
      updated_at: at,
      active:     true,
    };
    let mut identity = Identity::new("k", "Ada", "Lovelace", "ada", "ada@example.com");
    identity.attach(Some(&entry));
    assert_eq!(identity.remote_id.as_deref(), Some("abc"));
    assert_eq!(identity.checksum.as_deref(), Some("c1"));
    assert_eq!(identity.updated_at, Some(at));

    identity.attach(None);
    assert!(identity.remote_id.is_none());
    assert!(identity.checksum.is_none());
  }

  #[test]
  fn attach_treats_empty_remote_id_as_unassigned() {
    let entry = MappingEntry::new("", "c1", true);
    let mut group = Group::new("cn=g", "G", vec![]);
    group.attach(Some(&entry));
    assert!(group.remote_id.is_none());
  }
}
