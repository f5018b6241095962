use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured JSON tracing on stdout. Call once at service startup.
///
/// The filter comes from `RUST_LOG`, falling back to `default_directive`
/// (e.g. `"info"`) when the variable is unset or invalid. Subsequent calls
/// are silently ignored.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .try_init();
}
