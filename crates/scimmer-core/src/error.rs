//! Error types for `scimmer-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid encoded source key {0:?}")]
  InvalidEncoding(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
