//! [`MappingEntry`], the value type of the mapping store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the engine remembers about one source key between runs.
///
/// An entry with a non-empty `remote_id` is only ever written after the
/// entity was successfully created remotely (or, in dry run, assigned a
/// placeholder that is never flushed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
  pub remote_id:  String,
  pub checksum:   String,
  pub updated_at: DateTime<Utc>,
  /// Activation state at the time of the last sync. Groups are always
  /// recorded as active.
  #[serde(default = "default_active")]
  pub active:     bool,
}

fn default_active() -> bool { true }

impl MappingEntry {
  /// Build an entry stamped with the current time.
  pub fn new(
    remote_id: impl Into<String>,
    checksum: impl Into<String>,
    active: bool,
  ) -> Self {
    Self {
      remote_id: remote_id.into(),
      checksum: checksum.into(),
      updated_at: Utc::now(),
      active,
    }
  }

  pub fn has_remote_id(&self) -> bool { !self.remote_id.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serialises_with_camel_case_keys() {
    let entry = MappingEntry::new("r-1", "sum", false);
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["remoteId"], "r-1");
    assert_eq!(value["checksum"], "sum");
    assert_eq!(value["active"], false);
    assert!(value.get("updatedAt").is_some());
  }

  #[test]
  fn active_defaults_to_true_when_missing() {
    let json = r#"{"remoteId":"r","checksum":"c","updatedAt":"2024-01-01T00:00:00Z"}"#;
    let entry: MappingEntry = serde_json::from_str(json).unwrap();
    assert!(entry.active);
    assert!(entry.has_remote_id());
  }
}
