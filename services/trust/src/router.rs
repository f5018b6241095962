use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use warden_core::health::{healthz, readiness};
use warden_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    device::{forget_device, get_current_device, get_devices, report_hijack},
    session::{
        create_session, end_session, get_session, get_sessions, lock_session,
        refresh_session_code, unlock_session,
    },
};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Sessions
        .route("/sessions", get(get_sessions))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}", delete(end_session))
        .route("/sessions/{id}/lock", post(lock_session))
        .route("/sessions/{id}/unlock", post(unlock_session))
        .route("/sessions/{id}/refresh", post(refresh_session_code))
        // Devices
        .route("/devices", get(get_devices))
        .route("/devices/current", get(get_current_device))
        .route("/devices/{id}", delete(forget_device))
        .route("/devices/{id}/hijack", post(report_hijack))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}
