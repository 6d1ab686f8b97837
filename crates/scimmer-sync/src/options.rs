//! Engine options.

use std::time::Duration;

/// How the engine talks to the remote and treats inactive principals.
#[derive(Debug, Clone)]
pub struct SyncOptions {
  /// Issue no network calls; assign `dry_run_<key>` placeholders instead.
  pub dry_run:            bool,
  /// Send all pending creates as one `/Bulk` request.
  pub bulk:               bool,
  /// The remote keeps inactive principals: inactive users are created
  /// (with `active: false`) and stay group members.
  pub upload_inactive:    bool,
  /// Delete users that were active at the last sync and are now inactive.
  pub delete_inactive:    bool,
  /// Pause between scans of the mapping store while a group waits for
  /// members.
  pub poll_interval:      Duration,
  /// How long a group may wait for its members before giving up.
  pub dependency_timeout: Duration,
  /// Upper bound on concurrent remote calls.
  pub max_concurrency:    usize,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      dry_run:            false,
      bulk:               false,
      upload_inactive:    false,
      delete_inactive:    false,
      poll_interval:      Duration::from_secs(1),
      dependency_timeout: Duration::from_secs(300),
      max_concurrency:    32,
    }
  }
}
