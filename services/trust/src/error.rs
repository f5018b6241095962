use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Trust service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum TrustServiceError {
    #[error("device not found")]
    DeviceNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("invalid transition: {entity} is {status}")]
    InvalidTransition {
        entity: &'static str,
        status: &'static str,
    },
    #[error("session is already locked or not active")]
    SessionNotActive,
    #[error("session is not locked")]
    SessionNotLocked,
    #[error("invalid code")]
    InvalidCode,
    #[error("transition conflict")]
    TransitionConflict,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl TrustServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::SessionNotActive => "SESSION_NOT_ACTIVE",
            Self::SessionNotLocked => "SESSION_NOT_LOCKED",
            Self::InvalidCode => "INVALID_CODE",
            Self::TransitionConflict => "TRANSITION_CONFLICT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn device_transition(status: warden_domain::device::DeviceStatus) -> Self {
        Self::InvalidTransition {
            entity: "device",
            status: status.as_str(),
        }
    }

    pub fn session_transition(status: warden_domain::session::SessionStatus) -> Self {
        Self::InvalidTransition {
            entity: "session",
            status: status.as_str(),
        }
    }
}

impl IntoResponse for TrustServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::DeviceNotFound | Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::SessionNotActive | Self::SessionNotLocked => StatusCode::BAD_REQUEST,
            Self::InvalidCode => StatusCode::UNAUTHORIZED,
            Self::TransitionConflict => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<TrustServiceError> for tonic::Status {
    fn from(e: TrustServiceError) -> Self {
        match e {
            TrustServiceError::DeviceNotFound | TrustServiceError::SessionNotFound => {
                Self::not_found(e.to_string())
            }
            TrustServiceError::InvalidTransition { .. }
            | TrustServiceError::SessionNotActive
            | TrustServiceError::SessionNotLocked => Self::failed_precondition(e.to_string()),
            TrustServiceError::InvalidCode => Self::unauthenticated(e.to_string()),
            TrustServiceError::TransitionConflict => Self::aborted(e.to_string()),
            TrustServiceError::Internal(ref inner) => {
                tracing::error!(error = %inner, kind = "INTERNAL", "internal error");
                Self::internal(e.to_string())
            }
        }
    }
}
