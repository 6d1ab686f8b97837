//! Reader for a JSON directory export.
//!
//! ```json
//! {
//!   "users":  [{ "source_key": "uid=ada,ou=people", "first_name": "Ada",
//!                "last_name": "Lovelace", "username": "ada",
//!                "email": "ada@example.com", "active": true }],
//!   "groups": [{ "source_key": "cn=staff,ou=groups", "display_name": "Staff",
//!                "members": ["uid=ada,ou=people"] }]
//! }
//! ```

use std::{collections::HashSet, path::Path};

use anyhow::{Context as _, bail};
use scimmer_core::{Group, Identity};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Export {
  #[serde(default)]
  pub users:  Vec<Identity>,
  #[serde(default)]
  pub groups: Vec<Group>,
}

impl Export {
  pub async fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = tokio::fs::read(path)
      .await
      .with_context(|| format!("failed to read directory export {}", path.display()))?;
    let export: Export = serde_json::from_slice(&raw)
      .with_context(|| format!("failed to parse directory export {}", path.display()))?;
    export.validate()?;
    Ok(export.strip_remote_state())
  }

  /// Source keys are shared between users and groups, so they must be
  /// unique across both.
  fn validate(&self) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    let keys = self
      .users
      .iter()
      .map(|u| &u.source_key)
      .chain(self.groups.iter().map(|g| &g.source_key));
    for key in keys {
      if key.is_empty() {
        bail!("directory export contains an entity with an empty source_key");
      }
      if !seen.insert(key) {
        bail!("duplicate source_key in directory export: {key}");
      }
    }
    Ok(())
  }

  /// Remote state comes from the mapping file, never from the source.
  fn strip_remote_state(mut self) -> Self {
    for user in &mut self.users {
      user.attach(None);
    }
    for group in &mut self.groups {
      group.attach(None);
    }
    self
  }

  pub fn user(&self, source_key: &str) -> Option<&Identity> {
    self.users.iter().find(|u| u.source_key == source_key)
  }

  pub fn group(&self, source_key: &str) -> Option<&Group> {
    self.groups.iter().find(|g| g.source_key == source_key)
  }
}
