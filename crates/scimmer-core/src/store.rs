//! The `MappingStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `scimmer-store-file`).
//! The sync engine depends on this abstraction, never on a concrete backend,
//! and never sees the lock that backends use internally.

use std::future::Future;

use crate::mapping::MappingEntry;

/// Durable map from source key to [`MappingEntry`].
///
/// Implementations own their synchronisation: reads may run concurrently,
/// writes are exclusive. Mutations are in-memory until [`flush`] makes them
/// durable.
///
/// All methods return `Send` futures so the store can be shared across tokio
/// tasks.
///
/// [`flush`]: MappingStore::flush
pub trait MappingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up the entry for `source_key`.
  fn get<'a>(
    &'a self,
    source_key: &'a str,
  ) -> impl Future<Output = Result<Option<MappingEntry>, Self::Error>> + Send + 'a;

  /// Insert or overwrite the entry for `source_key`.
  fn put(
    &self,
    source_key: String,
    entry: MappingEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove the entry for `source_key`, returning it if present.
  fn remove<'a>(
    &'a self,
    source_key: &'a str,
  ) -> impl Future<Output = Result<Option<MappingEntry>, Self::Error>> + Send + 'a;

  /// Number of entries currently held.
  fn len(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Persist the current mapping atomically.
  fn flush(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
