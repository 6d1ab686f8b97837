//! Source-key encoding.
//!
//! Source keys are distinguished names and may contain characters that are
//! awkward inside identifiers. Wherever a key has to appear inside another
//! identifier (dry-run placeholders, bulk ids) it is base64-encoded first.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{Error, Result};

/// Prefix of placeholder remote identifiers assigned during a dry run.
pub const DRY_RUN_PREFIX: &str = "dry_run_";

pub fn encode_source_key(source_key: &str) -> String {
  STANDARD.encode(source_key.as_bytes())
}

pub fn decode_source_key(encoded: &str) -> Result<String> {
  let bytes = STANDARD
    .decode(encoded)
    .map_err(|_| Error::InvalidEncoding(encoded.to_string()))?;
  String::from_utf8(bytes).map_err(|_| Error::InvalidEncoding(encoded.to_string()))
}

/// `dry_run_<base64 source key>`.
pub fn dry_run_remote_id(source_key: &str) -> String {
  format!("{DRY_RUN_PREFIX}{}", encode_source_key(source_key))
}
