//! Per-run outcome tracking.

use std::fmt;

use crate::Error;

/// What happened to a single entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Created { remote_id: String },
  Updated { remote_id: String },
  Deleted,
  /// Checksum and activation unchanged; nothing sent.
  Unchanged,
  /// Inactive principal the remote does not keep; nothing sent.
  Skipped,
}

/// An entity whose task ended in an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
  pub source_key: String,
  pub error:      String,
}

/// Source keys grouped by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub created:   Vec<String>,
  pub updated:   Vec<String>,
  pub deleted:   Vec<String>,
  pub unchanged: Vec<String>,
  pub skipped:   Vec<String>,
  pub failed:    Vec<Failure>,
}

impl SyncReport {
  pub fn record(&mut self, source_key: String, result: &Result<Outcome, Error>) {
    match result {
      Ok(Outcome::Created { .. }) => self.created.push(source_key),
      Ok(Outcome::Updated { .. }) => self.updated.push(source_key),
      Ok(Outcome::Deleted) => self.deleted.push(source_key),
      Ok(Outcome::Unchanged) => self.unchanged.push(source_key),
      Ok(Outcome::Skipped) => self.skipped.push(source_key),
      Err(e) => self.fail(source_key, e.to_string()),
    }
  }

  pub fn fail(&mut self, source_key: String, error: String) {
    self.failed.push(Failure { source_key, error });
  }

  pub fn merge(&mut self, other: SyncReport) {
    self.created.extend(other.created);
    self.updated.extend(other.updated);
    self.deleted.extend(other.deleted);
    self.unchanged.extend(other.unchanged);
    self.skipped.extend(other.skipped);
    self.failed.extend(other.failed);
  }

  pub fn is_clean(&self) -> bool { self.failed.is_empty() }
}

impl fmt::Display for SyncReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "created={} updated={} deleted={} unchanged={} skipped={} failed={}",
      self.created.len(),
      self.updated.len(),
      self.deleted.len(),
      self.unchanged.len(),
      self.skipped.len(),
      self.failed.len(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_sorts_outcomes() {
    let mut report = SyncReport::default();
    report.record("a".into(), &Ok(Outcome::Created { remote_id: "1".into() }));
    report.record("b".into(), &Ok(Outcome::Unchanged));
    report.record("c".into(), &Err(Error::Cancelled));

    assert_eq!(report.created, vec!["a"]);
    assert_eq!(report.unchanged, vec!["b"]);
    assert_eq!(report.failed[0].source_key, "c");
    assert!(!report.is_clean());
    assert_eq!(
      report.to_string(),
      "created=1 updated=0 deleted=0 unchanged=1 skipped=0 failed=1"
    );
  }
}
