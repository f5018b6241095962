//! Device cookie: transport for the client's stable device token.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use http::request::Parts;
use time::Duration;

use warden_domain::id::DeviceId;

/// Cookie name for the device token.
pub const WARDEN_DEVICE_ID: &str = "warden_device_id";

/// Cookie Max-Age in seconds (400 days, the longest browsers honor).
pub const DEVICE_COOKIE_MAX_AGE: i64 = 34_560_000;

/// Set the device cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use warden_auth_types::cookie::{set_device_cookie, WARDEN_DEVICE_ID};
/// use warden_domain::id::DeviceId;
///
/// let id = DeviceId::generate();
/// let jar = set_device_cookie(CookieJar::new(), id, "example.com".to_string());
/// let cookie = jar.get(WARDEN_DEVICE_ID).unwrap();
/// assert_eq!(cookie.value(), id.to_string());
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_device_cookie(jar: CookieJar, device_id: DeviceId, domain: String) -> CookieJar {
    let cookie = Cookie::build((WARDEN_DEVICE_ID, device_id.to_string()))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(DEVICE_COOKIE_MAX_AGE))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Expire the device cookie (Max-Age 0), e.g. after the device is forgotten.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use warden_auth_types::cookie::{clear_device_cookie, WARDEN_DEVICE_ID};
///
/// let jar = clear_device_cookie(CookieJar::new(), "example.com".to_string());
/// let cookie = jar.get(WARDEN_DEVICE_ID).unwrap();
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// assert_eq!(cookie.value(), "");
/// ```
pub fn clear_device_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((WARDEN_DEVICE_ID, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Raw device token read from the request, if any.
///
/// The value is left opaque; resolving it against stored devices (and treating
/// unknown or malformed tokens as unauthenticated) is the service's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCookie(pub Option<String>);

impl<S> FromRequestParts<S> for DeviceCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = CookieJar::from_headers(&parts.headers)
            .get(WARDEN_DEVICE_ID)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty());
        async move { Ok(Self(token)) }
    }
}
