//! Domain types shared across Warden services.
//!
//! Pure types with no framework dependencies: identifiers, status machines,
//! fingerprints and pagination.

pub mod device;
pub mod id;
pub mod pagination;
pub mod session;
pub mod transition;
pub mod user;
