//! Per-entity decision: which remote operation, if any, an entity needs.

use scimmer_core::{Change, Identity, MappingEntry};

use crate::options::SyncOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
  Create,
  Update,
  Delete,
  Unchanged,
  /// New inactive user the remote does not keep, or an inactive user that
  /// was already deleted remotely.
  Skip,
}

/// Decide what to do with a user.
///
/// `active` is not part of the checksum, so a change of activation against
/// the stored entry is treated as a modification in its own right.
pub(crate) fn for_identity(
  identity: &Identity,
  change: Change,
  prior: Option<&MappingEntry>,
  options: &SyncOptions,
) -> Action {
  let prior = match (change, prior) {
    (Change::New, Some(deleted)) if !deleted.active && !identity.active => return Action::Skip,
    (Change::New, _) | (_, None) => {
      return if identity.active || options.upload_inactive {
        Action::Create
      } else {
        Action::Skip
      };
    }
    (_, Some(prior)) => prior,
  };

  if !identity.active && prior.active && options.delete_inactive {
    Action::Delete
  } else if change == Change::Modified || identity.active != prior.active {
    Action::Update
  } else {
    Action::Unchanged
  }
}

/// Decide what to do with a group. Groups carry no activation state.
pub(crate) fn for_group(change: Change) -> Action {
  match change {
    Change::New => Action::Create,
    Change::Modified => Action::Update,
    Change::Unchanged => Action::Unchanged,
  }
}

#[cfg(test)]
mod tests {
  use scimmer_core::change::classify;

  use super::*;

  fn user(active: bool) -> Identity {
    let mut identity = Identity::new("uid=u", "U", "Ser", "user", "u@example.com");
    identity.active = active;
    identity
  }

  fn decide(identity: &Identity, prior: Option<&MappingEntry>, options: &SyncOptions) -> Action {
    let change = classify(&identity.current_checksum(), prior);
    for_identity(identity, change, prior, options)
  }

  fn synced(identity: &Identity, active: bool) -> MappingEntry {
    MappingEntry::new("r-1", identity.current_checksum(), active)
  }

  #[test]
  fn new_active_user_is_created() {
    assert_eq!(decide(&user(true), None, &SyncOptions::default()), Action::Create);
  }

  #[test]
  fn new_inactive_user_is_skipped_unless_uploaded() {
    let inactive = user(false);
    assert_eq!(decide(&inactive, None, &SyncOptions::default()), Action::Skip);

    let options = SyncOptions { upload_inactive: true, ..Default::default() };
    assert_eq!(decide(&inactive, None, &options), Action::Create);
  }

  #[test]
  fn unchanged_user_needs_nothing() {
    let u = user(true);
    let prior = synced(&u, true);
    assert_eq!(decide(&u, Some(&prior), &SyncOptions::default()), Action::Unchanged);
  }

  #[test]
  fn modified_user_is_updated() {
    let mut u = user(true);
    let prior = synced(&u, true);
    u.last_name = "Changed".into();
    assert_eq!(decide(&u, Some(&prior), &SyncOptions::default()), Action::Update);
  }

  #[test]
  fn deactivation_updates_or_deletes() {
    let u = user(false);
    let prior = synced(&u, true);
    assert_eq!(decide(&u, Some(&prior), &SyncOptions::default()), Action::Update);

    let options = SyncOptions { delete_inactive: true, ..Default::default() };
    assert_eq!(decide(&u, Some(&prior), &options), Action::Delete);
  }

  #[test]
  fn already_inactive_user_is_not_deleted_again() {
    let u = user(false);
    let prior = synced(&u, false);
    let options = SyncOptions { delete_inactive: true, ..Default::default() };
    assert_eq!(decide(&u, Some(&prior), &options), Action::Unchanged);
  }

  #[test]
  fn deleted_user_stays_deleted_until_reactivated() {
    let deleted = MappingEntry::new("", "old", false);
    let options = SyncOptions { upload_inactive: true, delete_inactive: true, ..Default::default() };
    assert_eq!(decide(&user(false), Some(&deleted), &options), Action::Skip);
    assert_eq!(decide(&user(true), Some(&deleted), &options), Action::Create);
  }

  #[test]
  fn reactivation_is_an_update() {
    let u = user(true);
    let prior = synced(&u, false);
    assert_eq!(decide(&u, Some(&prior), &SyncOptions::default()), Action::Update);
  }

  #[test]
  fn group_actions_follow_change() {
    assert_eq!(for_group(Change::New), Action::Create);
    assert_eq!(for_group(Change::Modified), Action::Update);
    assert_eq!(for_group(Change::Unchanged), Action::Unchanged);
  }
}
