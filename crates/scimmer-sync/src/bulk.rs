//! Bulk planner.
//!
//! Bootstrap path for an empty remote that supports `/Bulk`: every pending
//! create (users first, then groups) goes into one request. Group members
//! without a remote identifier yet are expressed as `bulkId:` forward
//! references to the operation that creates them. Updates, deletes and the
//! polling resolver are not used on this path.

use std::collections::{HashMap, HashSet};

use scimmer_core::{
  Group, Identity, MappingEntry, MappingStore,
  encode::{decode_source_key, encode_source_key},
};
use scimmer_scim::{
  BulkOperation, BulkRequest, BulkResponse, ScimGroup, ScimUser,
  bulk::bulk_reference,
};

use crate::{Engine, Error, Result, SyncOptions, SyncReport, engine::failed};

#[derive(Debug, Clone)]
pub(crate) struct Planned {
  pub checksum: String,
  pub active:   bool,
}

/// An assembled bulk request plus what is needed to record its results.
#[derive(Debug, Clone, Default)]
pub struct BulkPlan {
  pub request:         BulkRequest,
  /// Entities left out: already created remotely, or inactive.
  pub skipped:         Vec<String>,
  /// Planned entities by source key.
  pub(crate) entities: HashMap<String, Planned>,
}

/// Assemble the bulk request for every user and group without a remote id.
pub async fn plan<S: MappingStore>(
  store: &S,
  users: &[Identity],
  groups: &[Group],
  options: &SyncOptions,
) -> Result<BulkPlan> {
  let mut plan = BulkPlan::default();
  let mut inactive = HashSet::new();

  for user in users {
    let prior = store.get(&user.source_key).await.map_err(Error::persistence)?;
    if prior.as_ref().is_some_and(MappingEntry::has_remote_id) {
      plan.skipped.push(user.source_key.clone());
      continue;
    }
    let deleted = prior.as_ref().is_some_and(|e| !e.active);
    if !user.active && (deleted || !options.upload_inactive) {
      inactive.insert(user.source_key.as_str());
      plan.skipped.push(user.source_key.clone());
      continue;
    }

    let operation =
      BulkOperation::create_user(encode_source_key(&user.source_key), &ScimUser::from(user))?;
    plan.request.operations.push(operation);
    plan.entities.insert(
      user.source_key.clone(),
      Planned { checksum: user.current_checksum(), active: user.active },
    );
  }

  // Register every new group before translating members so nested groups can
  // reference each other regardless of input order.
  let mut new_groups = Vec::new();
  for group in groups {
    let prior = store.get(&group.source_key).await.map_err(Error::persistence)?;
    if prior.as_ref().is_some_and(MappingEntry::has_remote_id) {
      plan.skipped.push(group.source_key.clone());
      continue;
    }
    plan.entities.insert(
      group.source_key.clone(),
      Planned { checksum: group.current_checksum(), active: true },
    );
    new_groups.push(group);
  }

  for group in new_groups {
    let mut values = Vec::with_capacity(group.members.len());
    let mut seen = HashSet::new();

    for member in &group.members {
      let value = match store.get(member).await.map_err(Error::persistence)? {
        Some(e) if !e.active && !options.upload_inactive => continue,
        Some(e) if e.has_remote_id() => e.remote_id,
        _ if plan.entities.contains_key(member) => bulk_reference(&encode_source_key(member)),
        _ if inactive.contains(member.as_str()) => continue,
        _ => {
          tracing::warn!(
            group = %group.source_key,
            member = %member,
            "member is neither synced nor part of this bulk request, leaving it out",
          );
          continue;
        }
      };
      if seen.insert(value.clone()) {
        values.push(value);
      }
    }

    let operation = BulkOperation::create_group(
      encode_source_key(&group.source_key),
      &ScimGroup::new(group, values),
    )?;
    plan.request.operations.push(operation);
  }

  Ok(plan)
}

/// Plan, then either log the plan (dry run) or POST it and record results.
pub(crate) async fn run<S>(engine: &Engine<S>, users: &[Identity], groups: &[Group]) -> Result<SyncReport>
where
  S: MappingStore + 'static,
{
  let plan = plan(engine.store(), users, groups, engine.options()).await?;
  let mut report = SyncReport { skipped: plan.skipped.clone(), ..Default::default() };

  if plan.request.is_empty() {
    tracing::info!("nothing to create, bulk request not sent");
    return Ok(report);
  }

  if engine.options().dry_run {
    let pretty = serde_json::to_string_pretty(&plan.request)?;
    tracing::info!(operations = plan.request.operations.len(), "dry run: bulk request\n{pretty}");
    report.created.extend(plan.entities.into_keys());
    return Ok(report);
  }

  let sent = {
    let _permit = engine.permit().await?;
    engine.remote()?.bulk(&plan.request).await
  };
  let response = match sent {
    Ok(response) => response,
    Err(e) => {
      let e = failed("<bulk>", &plan.request, e);
      for key in plan.entities.into_keys() {
        report.fail(key, e.to_string());
      }
      return Ok(report);
    }
  };

  record_results(engine, plan.entities, response, &mut report).await?;
  engine.flush().await?;
  Ok(report)
}

async fn record_results<S>(
  engine: &Engine<S>,
  mut entities: HashMap<String, Planned>,
  response: BulkResponse,
  report: &mut SyncReport,
) -> Result<()>
where
  S: MappingStore + 'static,
{
  for result in response.operations {
    let Some(key) = result
      .bulk_id
      .as_deref()
      .and_then(|id| decode_source_key(id).ok())
    else {
      tracing::warn!(bulk_id = ?result.bulk_id, "bulk result for an unknown operation");
      continue;
    };
    let Some(planned) = entities.remove(&key) else {
      tracing::warn!(source_key = %key, "bulk result for an entity that was not planned");
      continue;
    };

    match result.remote_id().filter(|_| result.is_success()) {
      Some(remote_id) => {
        engine.record(&key, &remote_id, planned.checksum, planned.active).await?;
        tracing::info!(source_key = %key, %remote_id, "created via bulk");
        report.created.push(key);
      }
      None => {
        let detail = result.response.as_ref().map(ToString::to_string).unwrap_or_default();
        tracing::error!(source_key = %key, status = %result.status, response = %detail, "bulk operation failed");
        report.fail(key, format!("bulk operation returned status {}: {detail}", result.status));
      }
    }
  }

  for key in entities.into_keys() {
    tracing::error!(source_key = %key, "no result for planned bulk operation");
    report.fail(key, "missing from bulk response".into());
  }
  Ok(())
}
