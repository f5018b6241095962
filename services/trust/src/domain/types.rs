use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use warden_domain::device::{DeviceStatus, Fingerprint};
use warden_domain::id::{DeviceId, SessionId, UserId};
use warden_domain::session::SessionStatus;

/// A recognized client installation bound to one user.
///
/// `hijacked_at` is set exactly when `status` is `Hijacked`. `verified_at`
/// survives a later hijack.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub user_id: UserId,
    pub status: DeviceStatus,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub hijacked_at: Option<DateTime<Utc>>,
}

impl Device {
    /// The device after a committed move to `status` at `at`.
    pub fn moved_to(&self, status: DeviceStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: at,
            verified_at: match status {
                DeviceStatus::Verified => Some(at),
                _ => self.verified_at,
            },
            hijacked_at: match status {
                DeviceStatus::Hijacked => Some(at),
                _ => None,
            },
            ..self.clone()
        }
    }
}

/// One authenticated login bound to a device.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub device_id: DeviceId,
    pub user_id: UserId,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The session after a committed move to `status` at `at`.
    pub fn moved_to(&self, status: SessionStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            last_activity_at: if status == SessionStatus::Active {
                at
            } else {
                self.last_activity_at
            },
            finished_at: if status == SessionStatus::Finished {
                Some(at)
            } else {
                self.finished_at
            },
            ..self.clone()
        }
    }
}

/// Result of applying an action to an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied<T> {
    /// This call committed a status change.
    Moved(T),
    /// The action was a no-op for the entity's status.
    Unchanged(T),
}

impl<T> Applied<T> {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Moved(t) | Self::Unchanged(t) => t,
        }
    }
}

/// A code handed out for a session, with the session as read after issuing.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCode {
    pub session: Session,
    pub code: String,
}

/// Single-use, time-bounded step-up code.
#[derive(Debug, Clone)]
pub struct StepUpCode {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl StepUpCode {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

/// A compare-and-set request against a session's status.
///
/// Applied only while the stored status still equals `from`. When
/// `revoke_codes` is set, the subject's outstanding code is consumed in the
/// same unit of work.
#[derive(Debug, Clone)]
pub struct SessionTransition {
    pub id: SessionId,
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub at: DateTime<Utc>,
    pub revoke_codes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustEventKind {
    DeviceCreated,
    DeviceVerified,
    DeviceHijacked,
    SessionEnded,
    SessionLocked,
    SessionUnlocked,
}

impl TrustEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceCreated => "device_created",
            Self::DeviceVerified => "device_verified",
            Self::DeviceHijacked => "device_hijacked",
            Self::SessionEnded => "session_ended",
            Self::SessionLocked => "session_locked",
            Self::SessionUnlocked => "session_unlocked",
        }
    }
}

/// Audit/alerting notification emitted after a committed transition.
#[derive(Debug, Clone, Serialize)]
pub struct TrustEvent {
    pub id: Uuid,
    pub kind: TrustEventKind,
    pub device_id: Option<DeviceId>,
    pub session_id: Option<SessionId>,
    /// Owner of the device or session.
    pub user_id: UserId,
    /// User who triggered the transition, when it differs from the owner's own request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
    #[serde(serialize_with = "warden_core::serde::to_rfc3339_ms")]
    pub occurred_at: DateTime<Utc>,
}

impl TrustEvent {
    pub fn device(kind: TrustEventKind, device: &Device, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            device_id: Some(device.id),
            session_id: None,
            user_id: device.user_id,
            actor_id: None,
            occurred_at: at,
        }
    }

    pub fn session(kind: TrustEventKind, session: &Session, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            device_id: Some(session.device_id),
            session_id: Some(session.id),
            user_id: session.user_id,
            actor_id: None,
            occurred_at: at,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.id)
    }
}

/// Step-up code length in digits.
pub const CODE_LEN: usize = 6;

/// Default step-up code time-to-live in seconds.
pub const CODE_TTL_SECS: i64 = 600;

/// Attempts the hijack path makes before giving up on a contended transition.
pub const CONTAINMENT_ATTEMPTS: usize = 3;
