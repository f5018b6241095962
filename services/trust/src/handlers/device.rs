use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use uuid::Uuid;

use warden_auth_types::cookie::{DeviceCookie, clear_device_cookie};
use warden_auth_types::identity::IdentityHeaders;
use warden_domain::device::{DeviceStatus, Fingerprint};
use warden_domain::id::DeviceId;

use crate::domain::types::Device;
use crate::error::TrustServiceError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DeviceResponse {
    pub id: DeviceId,
    pub status: DeviceStatus,
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms_opt")]
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms_opt")]
    pub hijacked_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Device> for DeviceResponse {
    fn from(d: Device) -> Self {
        Self {
            id: d.id,
            status: d.status,
            fingerprint: d.fingerprint,
            created_at: d.created_at,
            updated_at: d.updated_at,
            verified_at: d.verified_at,
            hijacked_at: d.hijacked_at,
        }
    }
}

// ── GET /devices ─────────────────────────────────────────────────────────────

pub async fn get_devices(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<Vec<DeviceResponse>>, TrustServiceError> {
    let devices = state.devices().list(identity.user_id).await?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

// ── GET /devices/current ─────────────────────────────────────────────────────

pub async fn get_current_device(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    DeviceCookie(token): DeviceCookie,
) -> Result<Json<DeviceResponse>, TrustServiceError> {
    let device = state
        .devices()
        .identity
        .resolve(token.as_deref(), identity.user_id)
        .await?
        .ok_or(TrustServiceError::DeviceNotFound)?;
    Ok(Json(device.into()))
}

// ── DELETE /devices/{id} ─────────────────────────────────────────────────────

pub async fn forget_device(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    DeviceCookie(token): DeviceCookie,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), TrustServiceError> {
    let devices = state.devices();
    let device = devices.get(DeviceId(id), identity.user_id).await?;
    devices.forget(&device).await?;
    let is_current = token.as_deref() == Some(device.id.to_string().as_str());
    let jar = if is_current {
        clear_device_cookie(jar, state.cookie_domain.clone())
    } else {
        jar
    };
    Ok((jar, StatusCode::NO_CONTENT))
}

// ── POST /devices/{id}/hijack ────────────────────────────────────────────────

/// The owner reports the device as compromised.
pub async fn report_hijack(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeviceResponse>, TrustServiceError> {
    let devices = state.devices();
    let device = devices.get(DeviceId(id), identity.user_id).await?;
    let device = devices.hijack(&device, Some(identity.user_id)).await?;
    Ok(Json(device.into()))
}
