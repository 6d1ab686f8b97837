//! Core types and trait definitions for the scimmer identity sync engine.
//!
//! This crate has no HTTP and no file I/O. Every other crate
//! depends on it: the mapping-store backend implements [`store::MappingStore`],
//! and the sync engine consumes the model and change detector defined here.

// Native `async fn` in trait impls; the trait itself spells out `Send`.
#![allow(async_fn_in_trait)]

pub mod change;
pub mod encode;
pub mod error;
pub mod mapping;
pub mod model;
pub mod store;

pub use change::Change;
pub use error::{Error, Result};
pub use mapping::MappingEntry;
pub use model::{Group, Identity};
pub use store::MappingStore;
