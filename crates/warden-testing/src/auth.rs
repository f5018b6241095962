//! Mock gateway identity for HTTP tests.
//!
//! Services behind the gateway receive `x-warden-user-id` + `x-warden-user-role`.
//! `MockAuth` produces those headers directly so no real gateway is needed.

use http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use warden_auth_types::identity::{X_WARDEN_USER_ID, X_WARDEN_USER_ROLE};
use warden_domain::id::UserId;
use warden_domain::user::UserRole;

/// Identity injected into test requests.
#[derive(Debug, Clone, Copy)]
pub struct MockAuth {
    pub user_id: UserId,
    pub role: UserRole,
}

impl MockAuth {
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// A fresh normal user.
    pub fn user() -> Self {
        Self::new(UserId(Uuid::new_v4()), UserRole::Normal)
    }

    /// A fresh admin, allowed to receive step-up codes in-band.
    pub fn admin() -> Self {
        Self::new(UserId(Uuid::new_v4()), UserRole::Admin)
    }

    /// Headers as if the gateway injected them.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static(X_WARDEN_USER_ID),
            HeaderValue::from_str(&self.user_id.to_string()).expect("uuid is a valid header"),
        );
        map.insert(
            HeaderName::from_static(X_WARDEN_USER_ROLE),
            HeaderValue::from_str(&self.role.as_u8().to_string()).expect("role is a valid header"),
        );
        map
    }
}
