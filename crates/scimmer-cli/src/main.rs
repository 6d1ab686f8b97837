//! `scimmer`: synchronise a directory export to a SCIM 2.0 endpoint.
//!
//! # Usage
//!
//! ```
//! scimmer --input directory.json                      # dry run, the default
//! scimmer --input directory.json --dry-run=false      # live run
//! scimmer user 'uid=ada,ou=people' --dry-run=false    # resync one user
//! ```
//!
//! Settings are read from `scimmer.toml` (or `--config`), then `SCIMMER_*`
//! environment variables, then flags.

mod directory;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use directory::Export;
use scimmer_core::MappingStore as _;
use scimmer_scim::ScimClient;
use scimmer_store_file::FileStore;
use scimmer_sync::{Engine, SyncReport};
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Synchronise directory users and groups to a SCIM endpoint")]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "scimmer.toml")]
  pub config: PathBuf,

  #[command(subcommand)]
  pub command: Option<Command>,

  /// SCIM base URL.
  #[arg(long, global = true)]
  pub endpoint_url: Option<String>,

  /// Bearer token for the SCIM endpoint.
  #[arg(long, global = true)]
  pub token: Option<String>,

  /// Where source keys are mapped to remote ids.
  #[arg(long, global = true, value_name = "FILE")]
  pub mapping_file: Option<PathBuf>,

  /// JSON directory export to synchronise.
  #[arg(short, long, global = true, value_name = "FILE")]
  pub input: Option<PathBuf>,

  /// Log what would be sent instead of sending it.
  #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
  pub dry_run: Option<bool>,

  /// Use `/Bulk` for creates. Discovered from the endpoint when unset.
  #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
  pub bulk_supported: Option<bool>,

  /// Create inactive users and keep them as group members.
  #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
  pub upload_inactive: Option<bool>,

  /// Delete users that became inactive.
  #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
  pub delete_inactive: Option<bool>,

  /// Upper bound on concurrent SCIM requests.
  #[arg(long, global = true)]
  pub max_concurrency: Option<u64>,

  /// Default log level; `RUST_LOG` takes precedence.
  #[arg(long, global = true)]
  pub log_level: Option<String>,

  /// Emit logs as JSON lines.
  #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
  pub json_logging: Option<bool>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Synchronise every user, then every group (the default).
  Sync,
  /// Synchronise a single user from the export.
  User { source_key: String },
  /// Synchronise a single group from the export. Its members must already be
  /// mapped.
  Group { source_key: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let settings = Settings::load(&cli)?;
  init_tracing(&settings)?;

  let export = Export::load(&settings.input).await?;
  let store = FileStore::load(&settings.mapping_file)
    .await
    .with_context(|| format!("failed to load mapping file {}", settings.mapping_file.display()))?;

  let remote = settings
    .scim_config()
    .map(ScimClient::new)
    .transpose()
    .context("failed to build SCIM client")?;

  let bulk = use_bulk(&settings, remote.as_ref(), &store).await?;
  let engine = Engine::new(Arc::new(store), remote, settings.sync_options(bulk))
    .context("failed to build sync engine")?;

  let token = engine.cancellation_token();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupted, cancelling groups still waiting for members");
      token.cancel();
    }
  });

  match cli.command.unwrap_or(Command::Sync) {
    Command::Sync => {
      let report = engine.run(export.users, export.groups).await?;
      finish(&report)
    }
    Command::User { source_key } => {
      let Some(user) = export.user(&source_key) else {
        bail!("no user {source_key} in {}", settings.input.display());
      };
      let outcome = engine.sync_identity(user.clone()).await?;
      tracing::info!(%source_key, ?outcome, "user synchronised");
      Ok(())
    }
    Command::Group { source_key } => {
      let Some(group) = export.group(&source_key) else {
        bail!("no group {source_key} in {}", settings.input.display());
      };
      let outcome = engine.sync_group(group.clone()).await?;
      tracing::info!(%source_key, ?outcome, "group synchronised");
      Ok(())
    }
  }
}

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
  let level: LevelFilter = settings
    .log_level
    .parse()
    .with_context(|| format!("invalid log_level {:?}", settings.log_level))?;
  let filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let builder = tracing_subscriber::fmt().with_env_filter(filter);
  if settings.json_logging {
    builder.json().init();
  } else {
    builder.init();
  }
  Ok(())
}

/// Decide whether creates go through `/Bulk`.
///
/// An explicit setting wins. Otherwise bulk is used only for a first run
/// (empty mapping) against an endpoint that advertises it, since the bulk
/// path creates but never updates.
async fn use_bulk(
  settings: &Settings,
  remote: Option<&ScimClient>,
  store: &FileStore,
) -> anyhow::Result<bool> {
  if let Some(configured) = settings.bulk_supported {
    return Ok(configured);
  }
  let Some(remote) = remote.filter(|_| !settings.dry_run) else {
    return Ok(false);
  };
  if store.len().await? > 0 {
    return Ok(false);
  }

  match remote.service_provider_config().await {
    Ok(config) => {
      tracing::info!(
        bulk = config.bulk.supported,
        max_operations = config.bulk.max_operations,
        "discovered service provider config",
      );
      Ok(config.bulk.supported)
    }
    Err(e) => {
      tracing::warn!(error = %e, "service provider config unavailable, not using bulk");
      Ok(false)
    }
  }
}

fn finish(report: &SyncReport) -> anyhow::Result<()> {
  for failure in &report.failed {
    tracing::error!(source_key = %failure.source_key, error = %failure.error, "not synchronised");
  }
  tracing::info!(%report, "done");
  if !report.is_clean() {
    bail!("{} entities failed to synchronise", report.failed.len());
  }
  Ok(())
}
