//! Error type for `scimmer-sync`.
//!
//! Only [`Error::Persistence`] and [`Error::InvalidConfig`] are fatal to a
//! run. Every other variant ends the task of a single entity and is recorded
//! in the [`SyncReport`](crate::SyncReport).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("mapping store error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("remote rejected request with {status}: {body}")]
  RemoteRejection { status: u16, body: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("remote response for {0} carried no id")]
  MissingRemoteId(String),

  #[error("members of {group} never resolved: {unresolved:?}")]
  DependencyTimeout {
    group:      String,
    unresolved: Vec<String>,
  },

  #[error("cancelled")]
  Cancelled,

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}

impl Error {
  pub(crate) fn persistence<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(e))
  }

  /// Whether this error must abort the whole run.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Persistence(_) | Self::InvalidConfig(_))
  }
}

impl From<scimmer_scim::Error> for Error {
  fn from(e: scimmer_scim::Error) -> Self {
    match e {
      scimmer_scim::Error::Transport(e) => Self::Transport(e),
      scimmer_scim::Error::Rejected { status, body } => {
        Self::RemoteRejection { status, body }
      }
      scimmer_scim::Error::Serialization(e) => Self::Serialization(e),
      scimmer_scim::Error::InvalidConfig(m) => Self::InvalidConfig(m),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
