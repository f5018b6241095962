use axum::http::StatusCode;

/// Handler for `GET /healthz`: liveness only, never touches dependencies.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map the outcome of a dependency probe (database ping, ...) to a
/// readiness status for `GET /readyz`.
pub fn readiness<E: std::fmt::Display>(probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
