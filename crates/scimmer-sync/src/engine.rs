//! The [`Engine`] drives one synchronisation run.
//!
//! A run has two phases: all users, then all groups. Each phase spawns one
//! task per entity on a [`JoinSet`] and waits for every task to finish before
//! flushing the mapping store. A task that fails is logged and recorded in
//! the [`SyncReport`]; it never aborts its siblings or the run.

use std::{collections::HashSet, sync::Arc};

use scimmer_core::{
  Group, Identity, MappingEntry, MappingStore,
  change::classify,
  encode::dry_run_remote_id,
};
use scimmer_scim::{PatchRequest, ScimClient, ScimGroup, ScimUser};
use serde::Serialize;
use tokio::{
  sync::{Semaphore, SemaphorePermit},
  task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{
  Error, Outcome, Result, SyncOptions, SyncReport,
  action::{self, Action},
  bulk,
  resolve::DependencyResolver,
};

/// The synchronisation engine.
///
/// Cloning is cheap; clones share the store, the client, the concurrency
/// limit and the cancellation token.
pub struct Engine<S> {
  store:   Arc<S>,
  remote:  Option<ScimClient>,
  options: Arc<SyncOptions>,
  permits: Arc<Semaphore>,
  cancel:  CancellationToken,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      remote:  self.remote.clone(),
      options: Arc::clone(&self.options),
      permits: Arc::clone(&self.permits),
      cancel:  self.cancel.clone(),
    }
  }
}

impl<S> Engine<S>
where
  S: MappingStore + 'static,
{
  /// Build an engine. A remote client is required unless `options.dry_run`.
  pub fn new(store: Arc<S>, remote: Option<ScimClient>, options: SyncOptions) -> Result<Self> {
    if remote.is_none() && !options.dry_run {
      return Err(Error::InvalidConfig(
        "a SCIM client is required outside dry-run mode".into(),
      ));
    }
    if options.max_concurrency == 0 {
      return Err(Error::InvalidConfig("max_concurrency must be at least 1".into()));
    }
    Ok(Self {
      store,
      remote,
      permits: Arc::new(Semaphore::new(options.max_concurrency)),
      options: Arc::new(options),
      cancel: CancellationToken::new(),
    })
  }

  /// Token that stops every group still waiting for members.
  pub fn cancellation_token(&self) -> CancellationToken { self.cancel.clone() }

  pub fn options(&self) -> &SyncOptions { &self.options }

  pub fn store(&self) -> &S { &self.store }

  pub(crate) fn remote(&self) -> Result<&ScimClient> {
    self
      .remote
      .as_ref()
      .ok_or_else(|| Error::InvalidConfig("no SCIM client configured".into()))
  }

  // ── Batch entry point ─────────────────────────────────────────────────────

  /// Synchronise `users`, then `groups`.
  ///
  /// Returns `Err` only for fatal errors (mapping store, configuration);
  /// entity failures are in the report.
  pub async fn run(&self, users: Vec<Identity>, groups: Vec<Group>) -> Result<SyncReport> {
    tracing::info!(
      users = users.len(),
      groups = groups.len(),
      dry_run = self.options.dry_run,
      bulk = self.options.bulk,
      "starting sync run",
    );

    if self.options.bulk {
      let report = bulk::run(self, &users, &groups).await?;
      tracing::info!(%report, "bulk sync finished");
      return Ok(report);
    }

    // Inactive users may be skipped without an entry; groups listing them
    // must not wait for one.
    let inactive: HashSet<String> = users
      .iter()
      .filter(|u| !u.active)
      .map(|u| u.source_key.clone())
      .collect();

    let mut report = self.user_phase(users).await;
    self.flush().await?;

    report.merge(self.group_phase(groups, Arc::new(inactive)).await);
    self.flush().await?;

    tracing::info!(%report, "sync run finished");
    Ok(report)
  }

  async fn user_phase(&self, users: Vec<Identity>) -> SyncReport {
    let mut tasks = JoinSet::new();
    for identity in users {
      let engine = self.clone();
      tasks.spawn(async move {
        let key = identity.source_key.clone();
        let result = engine.sync_identity_inner(identity).await;
        (key, result)
      });
    }
    collect_phase("user", tasks).await
  }

  async fn group_phase(&self, groups: Vec<Group>, inactive: Arc<HashSet<String>>) -> SyncReport {
    let mut tasks = JoinSet::new();
    for group in groups {
      let engine = self.clone();
      let inactive = Arc::clone(&inactive);
      tasks.spawn(async move {
        let key = group.source_key.clone();
        let result = engine.sync_group_inner(group, &inactive).await;
        (key, result)
      });
    }
    collect_phase("group", tasks).await
  }

  pub(crate) async fn flush(&self) -> Result<()> {
    if self.options.dry_run {
      tracing::debug!("dry run, not flushing mapping");
      return Ok(());
    }
    self.store.flush().await.map_err(Error::persistence)
  }

  // ── Single-entity entry points ────────────────────────────────────────────

  /// Synchronise one identity outside a batch run and flush the store.
  pub async fn sync_identity(&self, identity: Identity) -> Result<Outcome> {
    let outcome = self.sync_identity_inner(identity).await;
    self.flush().await?;
    outcome
  }

  /// Synchronise one group outside a batch run and flush the store.
  pub async fn sync_group(&self, group: Group) -> Result<Outcome> {
    let outcome = self.sync_group_inner(group, &HashSet::new()).await;
    self.flush().await?;
    outcome
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn sync_identity_inner(&self, mut identity: Identity) -> Result<Outcome> {
    let prior = self
      .store
      .get(&identity.source_key)
      .await
      .map_err(Error::persistence)?;
    identity.attach(prior.as_ref());

    let checksum = identity.current_checksum();
    let change = classify(&checksum, prior.as_ref());
    let action = action::for_identity(&identity, change, prior.as_ref(), &self.options);
    let key = identity.source_key.as_str();

    match action {
      Action::Unchanged => {
        tracing::debug!(source_key = key, "user unchanged");
        Ok(Outcome::Unchanged)
      }
      Action::Skip => {
        tracing::debug!(source_key = key, "skipping inactive user");
        Ok(Outcome::Skipped)
      }
      Action::Create => self.create_user(&identity, checksum).await,
      Action::Update => self.update_user(&identity, checksum).await,
      Action::Delete => self.delete_user(&identity, checksum).await,
    }
  }

  async fn create_user(&self, identity: &Identity, checksum: String) -> Result<Outcome> {
    let key = &identity.source_key;

    if self.options.dry_run {
      let remote_id = dry_run_remote_id(key);
      tracing::info!(source_key = %key, %remote_id, "dry run: would create user");
      self.record(key, &remote_id, checksum, identity.active).await?;
      return Ok(Outcome::Created { remote_id });
    }

    let payload = ScimUser::from(identity);
    let created = {
      let _permit = self.permit().await?;
      self.remote()?.create_user(&payload).await
    }
    .map_err(|e| failed(key, &payload, e))?;

    let remote_id = created
      .id
      .filter(|id| !id.is_empty())
      .ok_or_else(|| Error::MissingRemoteId(key.clone()))?;
    self.record(key, &remote_id, checksum, identity.active).await?;
    tracing::info!(source_key = %key, %remote_id, user = %identity.username, "created user");
    Ok(Outcome::Created { remote_id })
  }

  async fn update_user(&self, identity: &Identity, checksum: String) -> Result<Outcome> {
    let key = &identity.source_key;
    let remote_id = identity
      .remote_id
      .clone()
      .ok_or_else(|| Error::MissingRemoteId(key.clone()))?;

    if self.options.dry_run {
      tracing::info!(source_key = %key, %remote_id, "dry run: would update user");
      return Ok(Outcome::Updated { remote_id });
    }

    let payload = ScimUser::from(identity);
    let replaced = {
      let _permit = self.permit().await?;
      self.remote()?.replace_user(&remote_id, &payload).await
    }
    .map_err(|e| failed(key, &payload, e))?;

    let remote_id = replaced
      .and_then(|u| u.id)
      .filter(|id| !id.is_empty())
      .unwrap_or(remote_id);
    self.record(key, &remote_id, checksum, identity.active).await?;
    tracing::info!(source_key = %key, %remote_id, active = identity.active, "updated user");
    Ok(Outcome::Updated { remote_id })
  }

  /// Delete remotely and keep an inactive entry without a remote id, so
  /// groups still listing the user exclude it and reactivation recreates it.
  async fn delete_user(&self, identity: &Identity, checksum: String) -> Result<Outcome> {
    let key = &identity.source_key;
    let remote_id = identity
      .remote_id
      .clone()
      .ok_or_else(|| Error::MissingRemoteId(key.clone()))?;

    if self.options.dry_run {
      tracing::info!(source_key = %key, %remote_id, "dry run: would delete user");
      return Ok(Outcome::Deleted);
    }

    let deleted = {
      let _permit = self.permit().await?;
      self.remote()?.delete_user(&remote_id).await
    };
    deleted.map_err(|e| failed(key, &remote_id, e))?;

    self.record(key, "", checksum, false).await?;
    tracing::info!(source_key = %key, %remote_id, "deleted deactivated user");
    Ok(Outcome::Deleted)
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn sync_group_inner(&self, mut group: Group, inactive: &HashSet<String>) -> Result<Outcome> {
    let prior = self
      .store
      .get(&group.source_key)
      .await
      .map_err(Error::persistence)?;
    group.attach(prior.as_ref());

    let checksum = group.current_checksum();
    let action = action::for_group(classify(&checksum, prior.as_ref()));

    if action == Action::Unchanged {
      tracing::debug!(source_key = %group.source_key, "group unchanged");
      return Ok(Outcome::Unchanged);
    }

    let members = DependencyResolver::new(
      self.store.as_ref(),
      self.options.poll_interval,
      self.options.dependency_timeout,
      self.options.upload_inactive,
      &self.cancel,
    )
    .excluding(inactive)
    .resolve(&group.source_key, &group.members)
    .await?;

    if !members.excluded.is_empty() {
      tracing::info!(
        source_key = %group.source_key,
        excluded = ?members.excluded,
        "inactive members left out of group",
      );
    }

    let payload = ScimGroup::new(&group, members.values);
    match action {
      Action::Create => self.create_group(&group, payload, checksum).await,
      _ => self.update_group(&group, payload, checksum).await,
    }
  }

  async fn create_group(
    &self,
    group: &Group,
    payload: ScimGroup,
    checksum: String,
  ) -> Result<Outcome> {
    let key = &group.source_key;

    if self.options.dry_run {
      let remote_id = dry_run_remote_id(key);
      tracing::info!(
        source_key = %key,
        %remote_id,
        members = payload.members.len(),
        "dry run: would create group",
      );
      self.record(key, &remote_id, checksum, true).await?;
      return Ok(Outcome::Created { remote_id });
    }

    let created = {
      let _permit = self.permit().await?;
      self.remote()?.create_group(&payload).await
    }
    .map_err(|e| failed(key, &payload, e))?;

    let remote_id = created
      .id
      .filter(|id| !id.is_empty())
      .ok_or_else(|| Error::MissingRemoteId(key.clone()))?;
    self.record(key, &remote_id, checksum, true).await?;
    tracing::info!(
      source_key = %key,
      %remote_id,
      group = %group.display_name,
      "created group",
    );
    Ok(Outcome::Created { remote_id })
  }

  /// Groups cannot be replaced; only their member list is patched.
  async fn update_group(
    &self,
    group: &Group,
    payload: ScimGroup,
    checksum: String,
  ) -> Result<Outcome> {
    let key = &group.source_key;
    let remote_id = group
      .remote_id
      .clone()
      .ok_or_else(|| Error::MissingRemoteId(key.clone()))?;

    if self.options.dry_run {
      tracing::info!(source_key = %key, %remote_id, "dry run: would replace group members");
      return Ok(Outcome::Updated { remote_id });
    }

    let patch = PatchRequest::replace_members(&payload.members)?;
    let patched = {
      let _permit = self.permit().await?;
      self.remote()?.patch_group(&remote_id, &patch).await
    };
    patched.map_err(|e| failed(key, &patch, e))?;

    self.record(key, &remote_id, checksum, true).await?;
    tracing::info!(
      source_key = %key,
      %remote_id,
      members = payload.members.len(),
      "replaced group members",
    );
    Ok(Outcome::Updated { remote_id })
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  pub(crate) async fn record(
    &self,
    source_key: &str,
    remote_id: &str,
    checksum: String,
    active: bool,
  ) -> Result<()> {
    self
      .store
      .put(source_key.to_string(), MappingEntry::new(remote_id, checksum, active))
      .await
      .map_err(Error::persistence)
  }

  pub(crate) async fn permit(&self) -> Result<SemaphorePermit<'_>> {
    self.permits.acquire().await.map_err(|_| Error::Cancelled)
  }
}

/// Log a failed remote call with the payload that caused it.
pub(crate) fn failed<P: Serialize + ?Sized>(
  source_key: &str,
  payload: &P,
  error: scimmer_scim::Error,
) -> Error {
  let payload = serde_json::to_string(payload).unwrap_or_default();
  match &error {
    scimmer_scim::Error::Rejected { status, body } => tracing::error!(
      source_key,
      status,
      %payload,
      response = %body,
      "remote rejected request",
    ),
    other => tracing::error!(source_key, %payload, error = %other, "remote request failed"),
  }
  Error::from(error)
}

/// Wait for every task of a phase and fold the results into a report.
async fn collect_phase(
  phase: &'static str,
  mut tasks: JoinSet<(String, Result<Outcome>)>,
) -> SyncReport {
  let mut report = SyncReport::default();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((key, result)) => {
        if let Err(e) = &result {
          tracing::warn!(phase, source_key = %key, error = %e, "entity sync failed");
        }
        report.record(key, &result);
      }
      Err(e) => {
        tracing::error!(phase, error = %e, "sync task panicked");
        report.fail(format!("<{phase} task>"), e.to_string());
      }
    }
  }
  tracing::info!(phase, %report, "phase finished");
  report
}
