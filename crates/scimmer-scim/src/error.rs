//! Error type for `scimmer-scim`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Network failure or timeout.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The endpoint answered with a non-2xx status.
  #[error("remote rejected request with {status}: {body}")]
  Rejected { status: u16, body: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("invalid client configuration: {0}")]
  InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
