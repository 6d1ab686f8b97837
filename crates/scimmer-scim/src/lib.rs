//! SCIM 2.0 wire types and HTTP client for the remote endpoint.
//!
//! Only the subset of RFC 7643/7644 that the sync engine needs is modelled:
//! user and group resources, the "replace members" PATCH, bulk requests and
//! the bulk/patch flags of `ServiceProviderConfig`.

pub mod bulk;
pub mod client;
pub mod error;
pub mod resource;

pub use bulk::{BulkOperation, BulkRequest, BulkResponse};
pub use client::{ScimClient, ScimConfig, ServiceProviderConfig};
pub use error::{Error, Result};
pub use resource::{PatchRequest, ScimGroup, ScimMember, ScimUser};
