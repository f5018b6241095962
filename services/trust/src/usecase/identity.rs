use warden_domain::device::{DeviceStatus, Fingerprint};
use warden_domain::id::{DeviceId, UserId};

use crate::domain::clock::Clock;
use crate::domain::repository::{DeviceRepository, TrustEventSink};
use crate::domain::types::{Device, TrustEvent, TrustEventKind};
use crate::error::TrustServiceError;
use crate::usecase::emit;

/// Maps the client's opaque device token to a stored device, and creates
/// devices on first sight. Never changes a device's status.
pub struct IdentityBinding<D, E, K>
where
    D: DeviceRepository,
    E: TrustEventSink,
    K: Clock,
{
    pub devices: D,
    pub events: E,
    pub clock: K,
}

impl<D, E, K> IdentityBinding<D, E, K>
where
    D: DeviceRepository,
    E: TrustEventSink,
    K: Clock,
{
    /// `Ok(None)` when the request carries no token. A malformed token, an
    /// unknown id and another user's device all resolve to `DeviceNotFound`.
    pub async fn resolve(
        &self,
        token: Option<&str>,
        user_id: UserId,
    ) -> Result<Option<Device>, TrustServiceError> {
        let Some(token) = token else {
            return Ok(None);
        };
        let id = token
            .parse::<DeviceId>()
            .map_err(|_| TrustServiceError::DeviceNotFound)?;
        self.owned(id, user_id).await.map(Some)
    }

    /// Device `id` as seen by `user_id`.
    pub async fn owned(&self, id: DeviceId, user_id: UserId) -> Result<Device, TrustServiceError> {
        self.devices
            .find(id)
            .await?
            .filter(|d| d.user_id == user_id)
            .ok_or(TrustServiceError::DeviceNotFound)
    }

    pub async fn lookup(&self, id: DeviceId) -> Result<Device, TrustServiceError> {
        self.devices
            .find(id)
            .await?
            .ok_or(TrustServiceError::DeviceNotFound)
    }

    pub async fn register(
        &self,
        fingerprint: Fingerprint,
        user_id: UserId,
    ) -> Result<Device, TrustServiceError> {
        let now = self.clock.now();
        let device = Device {
            id: DeviceId::generate(),
            user_id,
            status: DeviceStatus::Active,
            fingerprint,
            created_at: now,
            updated_at: now,
            verified_at: None,
            hijacked_at: None,
        };
        self.devices.create(&device).await?;
        tracing::info!(device_id = %device.id, user_id = %user_id, "device registered");
        emit(
            &self.events,
            TrustEvent::device(TrustEventKind::DeviceCreated, &device, now),
        )
        .await;
        Ok(device)
    }
}
