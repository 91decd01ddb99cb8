//! Reference implementation of the portal REST API.
//!
//! Serves the same envelope and endpoints the review client speaks, backed by
//! a [`PortalStore`], so the workflow can be run end to end without the real
//! portal.

pub mod catalog;
pub mod router;
pub mod service;
pub mod store;

pub use catalog::RubricCatalog;
pub use router::portal_router;
pub use service::{PortalError, PortalService};
pub use store::{InMemoryPortalStore, PortalStore, StoreError};
