#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use warden_domain::device::DeviceStatus;
use warden_domain::id::{DeviceId, SessionId, UserId};
use warden_domain::pagination::PageRequest;

use crate::domain::types::{Device, Session, SessionTransition, StepUpCode, TrustEvent};
use crate::error::TrustServiceError;

/// Repository for devices.
pub trait DeviceRepository: Send + Sync {
    async fn find(&self, id: DeviceId) -> Result<Option<Device>, TrustServiceError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Device>, TrustServiceError>;

    async fn create(&self, device: &Device) -> Result<(), TrustServiceError>;

    /// Move `id` from `from` to `to` if its stored status is still `from`.
    /// Stamps `verified_at` / `hijacked_at` for those targets. Returns `false` when the race was lost.
    async fn transition(
        &self,
        id: DeviceId,
        from: DeviceStatus,
        to: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, TrustServiceError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, id: DeviceId) -> Result<bool, TrustServiceError>;
}

/// Repository for sessions.
pub trait SessionRepository: Send + Sync {
    async fn find(&self, id: SessionId) -> Result<Option<Session>, TrustServiceError>;

    /// Newest first.
    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Vec<Session>, TrustServiceError>;

    async fn list_by_device(&self, device_id: DeviceId) -> Result<Vec<Session>, TrustServiceError>;

    /// Most recent non-finished session for the (device, user) pair.
    async fn find_open(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> Result<Option<Session>, TrustServiceError>;

    async fn create(&self, session: &Session) -> Result<(), TrustServiceError>;

    /// Bump `last_activity_at` while the session is still `Active`.
    async fn touch(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, TrustServiceError>;

    /// Compare-and-set on status. Sets `finished_at` when entering `Finished`
    /// and `last_activity_at` when entering `Active`.
    async fn transition(&self, transition: &SessionTransition) -> Result<bool, TrustServiceError>;

    /// Finish every non-finished session of the device and revoke their codes
    /// in one unit of work. Returns the sessions that changed.
    async fn finish_all_for_device(
        &self,
        device_id: DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Vec<Session>, TrustServiceError>;
}

/// Repository for step-up codes.
pub trait CodeRepository: Send + Sync {
    /// Revoke the subject's outstanding codes and store `code`, atomically.
    async fn replace(&self, code: &StepUpCode) -> Result<(), TrustServiceError>;

    /// Newest unconsumed, unexpired code for the subject.
    async fn find_outstanding(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<StepUpCode>, TrustServiceError>;

    /// Consume `id` if it is still unconsumed and unexpired at `at`.
    /// Exactly one concurrent caller observes `true`.
    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, TrustServiceError>;

    /// Consume every outstanding code for the subject. Returns how many were revoked.
    async fn consume_all(&self, subject_id: Uuid, at: DateTime<Utc>)
    -> Result<u64, TrustServiceError>;
}

/// Destination for trust notifications. Callers treat delivery as best-effort.
pub trait TrustEventSink: Send + Sync {
    async fn publish(&self, event: &TrustEvent) -> Result<(), TrustServiceError>;
}
