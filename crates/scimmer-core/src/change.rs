//! Change detection.
//!
//! Checksums are SHA-256 hashes over the synchronisation-relevant attributes
//! of an entity. Each field is length-prefixed before hashing so that moving
//! characters across a field boundary always changes the digest.

use sha2::{Digest, Sha256};

use crate::{
  mapping::MappingEntry,
  model::{Group, Identity},
};

/// Outcome of comparing an entity against its previous mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
  /// No prior remote identifier.
  New,
  /// Checksum equal to the stored checksum.
  Unchanged,
  /// Checksum differs from the stored checksum.
  Modified,
}

/// Classify an entity whose current checksum is `checksum`.
pub fn classify(checksum: &str, prior: Option<&MappingEntry>) -> Change {
  match prior {
    Some(entry) if entry.has_remote_id() => {
      if entry.checksum == checksum {
        Change::Unchanged
      } else {
        Change::Modified
      }
    }
    _ => Change::New,
  }
}

/// Checksum over first name, last name, email and username.
///
/// The `active` flag is excluded; activation changes are
/// detected by comparing against [`MappingEntry::active`].
pub fn identity_checksum(identity: &Identity) -> String {
  digest([
    identity.first_name.as_str(),
    identity.last_name.as_str(),
    identity.email.as_str(),
    identity.username.as_str(),
  ])
}

/// Checksum over the display name and the member set.
///
/// Members are sorted and de-duplicated first: member order is not a change.
pub fn group_checksum(group: &Group) -> String {
  let mut members: Vec<&str> = group.members.iter().map(String::as_str).collect();
  members.sort_unstable();
  members.dedup();
  digest(std::iter::once(group.display_name.as_str()).chain(members))
}

fn digest<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
  let mut hasher = Sha256::new();
  for field in fields {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
  }
  hex::encode(hasher.finalize())
}
