//! File backend for the scimmer mapping store.
//!
//! The whole mapping lives in memory behind a [`tokio::sync::RwLock`] and is
//! serialised to a single YAML file on [`flush`](scimmer_core::MappingStore::flush).

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::FileStore;

#[cfg(test)]
mod tests;
