//! Error type for `scimmer-store-file`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The mapping file exists but cannot be parsed.
  #[error("malformed mapping file {path}: {source}")]
  Malformed {
    path:   PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("failed to encode mapping: {0}")]
  Encode(#[from] serde_yaml::Error),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
