use serde::Deserialize;

use warden_core::config::Config;

use crate::infra::events::EventSinkKind;

/// Trust service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct TrustConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3114). Env var: `TRUST_PORT`.
    #[serde(default = "default_trust_port")]
    pub trust_port: u16,
    /// TCP port for the gRPC server (default 50052). Env var: `TRUST_GRPC_PORT`.
    #[serde(default = "default_trust_grpc_port")]
    pub trust_grpc_port: u16,
    /// Domain attribute of the device cookie (root domain, e.g. "example.com").
    pub cookie_domain: String,
    /// Step-up code lifetime in seconds (default 600).
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: i64,
    /// Return lock/refresh codes in HTTP responses to every caller. Test tooling only.
    #[serde(default)]
    pub expose_lock_codes: bool,
    /// `outbox` or `log`.
    #[serde(default)]
    pub event_sink: EventSinkKind,
}

impl Config for TrustConfig {}

fn default_trust_port() -> u16 {
    3114
}

fn default_trust_grpc_port() -> u16 {
    50052
}

fn default_code_ttl_secs() -> i64 {
    crate::domain::types::CODE_TTL_SECS
}
