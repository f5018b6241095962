//! HTTP identity types shared across Warden services and their callers.
//!
//! Provides the `IdentityHeaders` extractor for gateway-authenticated users and
//! the device cookie that carries the client's stable device token.

pub mod cookie;
pub mod identity;
