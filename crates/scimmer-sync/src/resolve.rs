//! Group member resolution.
//!
//! Member users (and nested groups) are synchronised by sibling tasks that
//! expose no completion signal. A group therefore polls the mapping store
//! until every member has a remote identifier or is excluded, and gives up
//! with [`Error::DependencyTimeout`] once its deadline passes.

use std::{collections::HashSet, time::Duration};

use scimmer_core::MappingStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Members of one group translated to remote identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMembers {
  /// Remote identifiers, in source order, without duplicates.
  pub values:   Vec<String>,
  /// Source keys dropped because they are inactive and the remote does not
  /// keep them, or because they were deleted remotely.
  pub excluded: Vec<String>,
}

#[derive(Debug, Clone)]
enum Slot {
  Pending,
  Resolved(String),
  Excluded,
}

/// Polls a [`MappingStore`] until a member list is fully resolved.
pub struct DependencyResolver<'a, S> {
  store:         &'a S,
  poll_interval: Duration,
  timeout:       Duration,
  keep_inactive: bool,
  /// Keys known to be inactive in this run that never got an entry.
  inactive:      Option<&'a HashSet<String>>,
  cancel:        &'a CancellationToken,
}

impl<'a, S: MappingStore> DependencyResolver<'a, S> {
  pub fn new(
    store: &'a S,
    poll_interval: Duration,
    timeout: Duration,
    keep_inactive: bool,
    cancel: &'a CancellationToken,
  ) -> Self {
    Self { store, poll_interval, timeout, keep_inactive, inactive: None, cancel }
  }

  /// Treat `keys` as inactive members even when the store has no entry for
  /// them, as for users skipped earlier in the same run.
  pub fn excluding(mut self, keys: &'a HashSet<String>) -> Self {
    self.inactive = Some(keys);
    self
  }

  fn known_inactive(&self, member: &str) -> bool {
    !self.keep_inactive && self.inactive.is_some_and(|keys| keys.contains(member))
  }

  /// Translate `members` (source keys) of `group_key` to remote identifiers.
  pub async fn resolve(&self, group_key: &str, members: &[String]) -> Result<ResolvedMembers> {
    let deadline = Instant::now() + self.timeout;
    let mut slots = vec![Slot::Pending; members.len()];

    loop {
      let mut pending = 0;
      for (slot, member) in slots.iter_mut().zip(members) {
        if !matches!(slot, Slot::Pending) {
          continue;
        }
        let entry = self.store.get(member).await.map_err(Error::persistence)?;
        match entry {
          // An inactive entry without a remote id was deleted remotely.
          Some(e) if !e.active && (!self.keep_inactive || !e.has_remote_id()) => {
            tracing::debug!(group = group_key, member = %member, "excluding inactive member");
            *slot = Slot::Excluded;
          }
          Some(e) if e.has_remote_id() => *slot = Slot::Resolved(e.remote_id),
          None if self.known_inactive(member) => {
            tracing::debug!(group = group_key, member = %member, "excluding skipped member");
            *slot = Slot::Excluded;
          }
          _ => pending += 1,
        }
      }

      if pending == 0 {
        return Ok(collect(members, slots));
      }

      let now = Instant::now();
      if now >= deadline {
        let unresolved = members
          .iter()
          .zip(&slots)
          .filter(|(_, slot)| matches!(slot, Slot::Pending))
          .map(|(member, _)| member.clone())
          .collect();
        return Err(Error::DependencyTimeout {
          group: group_key.to_string(),
          unresolved,
        });
      }

      tracing::debug!(
        group = group_key,
        resolved = members.len() - pending,
        total = members.len(),
        "waiting for members",
      );

      let pause = self.poll_interval.min(deadline - now);
      tokio::select! {
        _ = self.cancel.cancelled() => return Err(Error::Cancelled),
        _ = tokio::time::sleep(pause) => {}
      }
    }
  }
}

fn collect(members: &[String], slots: Vec<Slot>) -> ResolvedMembers {
  let mut resolved = ResolvedMembers::default();
  for (member, slot) in members.iter().zip(slots) {
    match slot {
      Slot::Resolved(id) if !resolved.values.contains(&id) => resolved.values.push(id),
      Slot::Excluded => resolved.excluded.push(member.clone()),
      _ => {}
    }
  }
  resolved
}

#[cfg(test)]
mod tests {
  use scimmer_core::MappingEntry;
  use scimmer_store_file::FileStore;

  use super::*;

  const POLL: Duration = Duration::from_millis(10);

  async fn resolve(
    store: &FileStore,
    members: &[&str],
    timeout: Duration,
    keep_inactive: bool,
  ) -> Result<ResolvedMembers> {
    let cancel = CancellationToken::new();
    let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
    DependencyResolver::new(store, POLL, timeout, keep_inactive, &cancel)
      .resolve("cn=g", &members)
      .await
  }

  #[tokio::test]
  async fn empty_group_resolves_immediately() {
    let store = FileStore::in_memory();
    let resolved = resolve(&store, &[], Duration::ZERO, false).await.unwrap();
    assert!(resolved.values.is_empty());
  }

  #[tokio::test]
  async fn known_members_translate_in_order() {
    let store = FileStore::in_memory();
    store.put("uid=b".into(), MappingEntry::new("r-b", "s", true)).await.unwrap();
    store.put("uid=a".into(), MappingEntry::new("r-a", "s", true)).await.unwrap();

    let resolved = resolve(&store, &["uid=a", "uid=b", "uid=a"], Duration::ZERO, false)
      .await
      .unwrap();
    assert_eq!(resolved.values, vec!["r-a", "r-b"]);
  }

  #[tokio::test]
  async fn inactive_members_are_excluded_unless_kept() {
    let store = FileStore::in_memory();
    store.put("uid=a".into(), MappingEntry::new("r-a", "s", true)).await.unwrap();
    store.put("uid=x".into(), MappingEntry::new("r-x", "s", false)).await.unwrap();

    let dropped = resolve(&store, &["uid=a", "uid=x"], Duration::ZERO, false).await.unwrap();
    assert_eq!(dropped.values, vec!["r-a"]);
    assert_eq!(dropped.excluded, vec!["uid=x"]);

    let kept = resolve(&store, &["uid=a", "uid=x"], Duration::ZERO, true).await.unwrap();
    assert_eq!(kept.values, vec!["r-a", "r-x"]);
  }

  #[tokio::test]
  async fn waits_for_a_member_created_later() {
    let store = FileStore::in_memory();
    let writer = store.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      writer.put("uid=late".into(), MappingEntry::new("r-late", "s", true)).await.unwrap();
    });

    let resolved = resolve(&store, &["uid=late"], Duration::from_secs(5), false)
      .await
      .unwrap();
    assert_eq!(resolved.values, vec!["r-late"]);
  }

  #[tokio::test]
  async fn missing_member_times_out_naming_it() {
    let store = FileStore::in_memory();
    store.put("uid=a".into(), MappingEntry::new("r-a", "s", true)).await.unwrap();

    let err = resolve(&store, &["uid=a", "uid=ghost"], Duration::from_millis(30), false)
      .await
      .unwrap_err();
    match err {
      Error::DependencyTimeout { group, unresolved } => {
        assert_eq!(group, "cn=g");
        assert_eq!(unresolved, vec!["uid=ghost"]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn deleted_member_is_excluded_even_when_inactive_are_kept() {
    let store = FileStore::in_memory();
    store.put("uid=gone".into(), MappingEntry::new("", "s", false)).await.unwrap();

    let resolved = resolve(&store, &["uid=gone"], Duration::ZERO, true).await.unwrap();
    assert!(resolved.values.is_empty());
    assert_eq!(resolved.excluded, vec!["uid=gone"]);
  }

  #[tokio::test]
  async fn skipped_members_are_excluded_without_an_entry() {
    let store = FileStore::in_memory();
    store.put("uid=a".into(), MappingEntry::new("r-a", "s", true)).await.unwrap();
    let cancel = CancellationToken::new();
    let skipped = HashSet::from(["uid=off".to_string()]);
    let members = vec!["uid=a".to_string(), "uid=off".to_string()];

    let resolved = DependencyResolver::new(&store, POLL, Duration::ZERO, false, &cancel)
      .excluding(&skipped)
      .resolve("cn=g", &members)
      .await
      .unwrap();
    assert_eq!(resolved.values, vec!["r-a"]);
    assert_eq!(resolved.excluded, vec!["uid=off"]);
  }

  #[tokio::test]
  async fn cancellation_ends_the_wait() {
    let store = FileStore::in_memory();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let members = vec!["uid=ghost".to_string()];

    let err = DependencyResolver::new(&store, POLL, Duration::from_secs(60), false, &cancel)
      .resolve("cn=g", &members)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
  }
}
