//! Layered configuration: file, then `SCIMMER_*` environment, then flags.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, bail};
use scimmer_scim::ScimConfig;
use scimmer_sync::SyncOptions;
use serde::Deserialize;

use crate::Cli;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SCIM base URL, e.g. `https://idm.example.com/scim/v2`.
  pub endpoint_url:            String,
  pub token:                   String,
  pub mapping_file:            PathBuf,
  /// JSON directory export to read users and groups from.
  pub input:                   PathBuf,
  pub dry_run:                 bool,
  /// `None` means ask the endpoint.
  pub bulk_supported:          Option<bool>,
  pub upload_inactive:         bool,
  pub delete_inactive:         bool,
  pub poll_interval_ms:        u64,
  pub dependency_timeout_secs: u64,
  pub request_timeout_secs:    u64,
  pub max_concurrency:         usize,
  pub log_level:               String,
  pub json_logging:            bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      endpoint_url:            String::new(),
      token:                   String::new(),
      mapping_file:            PathBuf::from("scim_id_map.yaml"),
      input:                   PathBuf::from("directory.json"),
      dry_run:                 true,
      bulk_supported:          None,
      upload_inactive:         false,
      delete_inactive:         false,
      poll_interval_ms:        1000,
      dependency_timeout_secs: 300,
      request_timeout_secs:    30,
      max_concurrency:         32,
      log_level:               "info".into(),
      json_logging:            false,
    }
  }
}

impl Settings {
  pub fn load(cli: &Cli) -> anyhow::Result<Self> {
    let path_arg = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());

    let built = config::Config::builder()
      .add_source(config::File::from(cli.config.clone()).required(false))
      .add_source(config::Environment::with_prefix("SCIMMER").try_parsing(true))
      .set_override_option("endpoint_url", cli.endpoint_url.clone())?
      .set_override_option("token", cli.token.clone())?
      .set_override_option("mapping_file", path_arg(&cli.mapping_file))?
      .set_override_option("input", path_arg(&cli.input))?
      .set_override_option("dry_run", cli.dry_run)?
      .set_override_option("bulk_supported", cli.bulk_supported)?
      .set_override_option("upload_inactive", cli.upload_inactive)?
      .set_override_option("delete_inactive", cli.delete_inactive)?
      .set_override_option("max_concurrency", cli.max_concurrency)?
      .set_override_option("log_level", cli.log_level.clone())?
      .set_override_option("json_logging", cli.json_logging)?
      .build()
      .context("failed to read configuration")?;

    let settings: Settings = built
      .try_deserialize()
      .context("failed to deserialise configuration")?;
    settings.validate()?;
    Ok(settings)
  }

  /// Reject settings that would fail only once the run is underway.
  pub fn validate(&self) -> anyhow::Result<()> {
    if !self.dry_run {
      if self.endpoint_url.trim().is_empty() {
        bail!("endpoint_url is required unless dry_run is enabled");
      }
      if self.token.is_empty() {
        bail!("token is required unless dry_run is enabled");
      }
    }
    if self.max_concurrency == 0 {
      bail!("max_concurrency must be at least 1");
    }
    if self.poll_interval_ms == 0 {
      bail!("poll_interval_ms must be at least 1");
    }
    Ok(())
  }

  /// Connection settings, or `None` when no endpoint is configured.
  pub fn scim_config(&self) -> Option<ScimConfig> {
    if self.endpoint_url.trim().is_empty() {
      return None;
    }
    Some(ScimConfig {
      endpoint_url: self.endpoint_url.clone(),
      token:        self.token.clone(),
      timeout:      Duration::from_secs(self.request_timeout_secs),
    })
  }

  pub fn sync_options(&self, bulk: bool) -> SyncOptions {
    SyncOptions {
      dry_run: self.dry_run,
      bulk,
      upload_inactive: self.upload_inactive,
      delete_inactive: self.delete_inactive,
      poll_interval: Duration::from_millis(self.poll_interval_ms),
      dependency_timeout: Duration::from_secs(self.dependency_timeout_secs),
      max_concurrency: self.max_concurrency,
    }
  }
}

#[cfg(test)]
mod tests {
  use clap::Parser;
  use tempfile::TempDir;

  use super::*;

  fn parse(args: &[&str]) -> Cli { Cli::try_parse_from(args).unwrap() }

  #[test]
  fn defaults_are_a_safe_dry_run() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let settings = Settings::load(&parse(&["scimmer", "--config", missing.to_str().unwrap()]))
      .unwrap();

    assert!(settings.dry_run);
    assert_eq!(settings.mapping_file, PathBuf::from("scim_id_map.yaml"));
    assert_eq!(settings.bulk_supported, None);
    assert_eq!(settings.sync_options(false).poll_interval, Duration::from_secs(1));
  }

  #[test]
  fn flags_override_the_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("scimmer.toml");
    std::fs::write(
      &file,
      "endpoint_url = \"https://file.example/scim\"\ntoken = \"from-file\"\nmax_concurrency = 4\n",
    )
    .unwrap();

    let settings = Settings::load(&parse(&[
      "scimmer",
      "--config",
      file.to_str().unwrap(),
      "--endpoint-url",
      "https://flag.example/scim",
      "--dry-run=false",
    ]))
    .unwrap();

    assert_eq!(settings.endpoint_url, "https://flag.example/scim");
    assert_eq!(settings.token, "from-file");
    assert_eq!(settings.max_concurrency, 4);
    assert!(!settings.dry_run);
  }

  #[test]
  fn live_run_without_endpoint_is_rejected() {
    let settings = Settings { dry_run: false, ..Default::default() };
    assert!(settings.validate().is_err());
    assert!(settings.scim_config().is_none());
  }
}
