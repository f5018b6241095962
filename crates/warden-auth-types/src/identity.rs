//! Gateway-injected identity headers extractor.

use axum::extract::FromRequestParts;
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

use warden_domain::id::UserId;
use warden_domain::user::UserRole;

pub const X_WARDEN_USER_ID: &str = "x-warden-user-id";
pub const X_WARDEN_USER_ROLE: &str = "x-warden-user-role";

/// Authenticated user as asserted by the gateway via `x-warden-user-id` and
/// `x-warden-user-role`.
///
/// Returns 401 if either header is absent or unparseable, including unknown roles.
#[derive(Debug, Clone, Copy)]
pub struct IdentityHeaders {
    pub user_id: UserId,
    pub role: UserRole,
}

impl<S> FromRequestParts<S> for IdentityHeaders
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // Header values are read synchronously so the returned future is 'static.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .headers
            .get(X_WARDEN_USER_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Uuid>().ok())
            .map(UserId);

        let role = parts
            .headers
            .get(X_WARDEN_USER_ROLE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u8>().ok())
            .and_then(UserRole::from_u8);

        async move {
            let user_id = user_id.ok_or(StatusCode::UNAUTHORIZED)?;
            let role = role.ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self { user_id, role })
        }
    }
}
