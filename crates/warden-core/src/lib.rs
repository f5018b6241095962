//! Service plumbing shared by Warden binaries: config loading, tracing,
//! health probes, request ids, and wire-format helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
