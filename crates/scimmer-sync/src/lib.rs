//! The scimmer synchronisation engine.
//!
//! Reconciles identities and groups read from a source directory against a
//! SCIM endpoint:
//!
//! - [`Engine`] runs users, then groups, one tokio task per entity, and
//!   flushes the mapping store after each phase.
//! - [`resolve::DependencyResolver`] holds a group back until its members
//!   have remote identifiers.
//! - [`bulk`] assembles all pending creates into one `/Bulk` request when the
//!   endpoint supports it.

mod action;

pub mod bulk;
pub mod engine;
pub mod error;
pub mod options;
pub mod report;
pub mod resolve;

pub use engine::Engine;
pub use error::{Error, Result};
pub use options::SyncOptions;
pub use report::{Outcome, SyncReport};
