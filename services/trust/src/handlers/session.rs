use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_auth_types::cookie::{DeviceCookie, clear_device_cookie, set_device_cookie};
use warden_auth_types::identity::IdentityHeaders;
use warden_domain::device::Fingerprint;
use warden_domain::id::{DeviceId, SessionId};
use warden_domain::pagination::PageRequest;
use warden_domain::session::SessionStatus;

use crate::domain::types::{IssuedCode, Session};
use crate::error::TrustServiceError;
use crate::handlers::device::DeviceResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub device_id: DeviceId,
    pub status: SessionStatus,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms")]
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms_opt")]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            device_id: s.device_id,
            status: s.status,
            created_at: s.created_at,
            last_activity_at: s.last_activity_at,
            finished_at: s.finished_at,
        }
    }
}

/// Lock and refresh responses. `login_code` is present only when the caller may relay it.
#[derive(Serialize)]
pub struct CodeResponse {
    pub session: SessionResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_code: Option<String>,
}

impl CodeResponse {
    /// The code is only echoed to callers allowed to relay it.
    fn new(state: &AppState, identity: &IdentityHeaders, issued: IssuedCode) -> Self {
        let relay = state.expose_lock_codes || identity.role.may_relay_codes();
        Self {
            session: issued.session.into(),
            login_code: relay.then_some(issued.code),
        }
    }
}

// ── POST /sessions ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct LoginResponse {
    pub device: DeviceResponse,
    pub session: SessionResponse,
    pub device_registered: bool,
}

/// Called by the gateway after a successful primary login.
pub async fn create_session(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    DeviceCookie(token): DeviceCookie,
    jar: CookieJar,
    Json(fingerprint): Json<Fingerprint>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), TrustServiceError> {
    let outcome = state
        .auth_flow()
        .on_login(token.as_deref(), fingerprint, identity.user_id)
        .await?;
    let jar = set_device_cookie(jar, outcome.device.id, state.cookie_domain.clone());
    Ok((
        StatusCode::CREATED,
        jar,
        Json(LoginResponse {
            device: outcome.device.into(),
            session: outcome.session.into(),
            device_registered: outcome.device_registered,
        }),
    ))
}

// ── GET /sessions ────────────────────────────────────────────────────────────

pub async fn get_sessions(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Vec<SessionResponse>>, TrustServiceError> {
    let sessions = state.sessions().list(identity.user_id, page).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

// ── GET /sessions/{id} ───────────────────────────────────────────────────────

pub async fn get_session(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, TrustServiceError> {
    let session = state.sessions().get(SessionId(id), identity.user_id).await?;
    Ok(Json(session.into()))
}

// ── DELETE /sessions/{id} ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EndSessionQuery {
    #[serde(default)]
    pub forget_device: bool,
}

pub async fn end_session(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<EndSessionQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), TrustServiceError> {
    state
        .auth_flow()
        .on_logout(SessionId(id), identity.user_id, query.forget_device)
        .await?;
    let jar = if query.forget_device {
        clear_device_cookie(jar, state.cookie_domain.clone())
    } else {
        jar
    };
    Ok((jar, StatusCode::NO_CONTENT))
}

// ── POST /sessions/{id}/lock ─────────────────────────────────────────────────

pub async fn lock_session(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CodeResponse>, TrustServiceError> {
    let sessions = state.sessions();
    let session = sessions.get(SessionId(id), identity.user_id).await?;
    let issued = sessions
        .lock_by_code(&session)
        .await?
        .ok_or(TrustServiceError::SessionNotActive)?;
    Ok(Json(CodeResponse::new(&state, &identity, issued)))
}

// ── POST /sessions/{id}/unlock ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UnlockRequest {
    pub login_code: String,
}

pub async fn unlock_session(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UnlockRequest>,
) -> Result<StatusCode, TrustServiceError> {
    let sessions = state.sessions();
    let session = sessions.get(SessionId(id), identity.user_id).await?;
    if !sessions.unlock_by_code(&session, &body.login_code).await? {
        return Err(TrustServiceError::InvalidCode);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /sessions/{id}/refresh ──────────────────────────────────────────────

pub async fn refresh_session_code(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CodeResponse>, TrustServiceError> {
    let sessions = state.sessions();
    let session = sessions.get(SessionId(id), identity.user_id).await?;
    let issued = sessions
        .refresh_code(&session)
        .await?
        .ok_or(TrustServiceError::SessionNotLocked)?;
    Ok(Json(CodeResponse::new(&state, &identity, issued)))
}
