use warden_domain::device::{DeviceAction, DeviceStatus, Fingerprint};
use warden_domain::id::{DeviceId, UserId};
use warden_domain::session::SessionStatus;
use warden_domain::transition::Transition;

use crate::domain::clock::Clock;
use crate::domain::repository::{CodeRepository, DeviceRepository, SessionRepository, TrustEventSink};
use crate::domain::types::{
    Applied, CONTAINMENT_ATTEMPTS, Device, Session, TrustEvent, TrustEventKind,
};
use crate::error::TrustServiceError;
use crate::usecase::identity::IdentityBinding;
use crate::usecase::session::SessionLifecycle;

/// Owns device status transitions and hijack containment.
pub struct DeviceLifecycle<D, S, C, E, K>
where
    D: DeviceRepository,
    S: SessionRepository,
    C: CodeRepository,
    E: TrustEventSink,
    K: Clock,
{
    pub identity: IdentityBinding<D, E, K>,
    pub sessions: SessionLifecycle<S, C, E, K>,
}

impl<D, S, C, E, K> DeviceLifecycle<D, S, C, E, K>
where
    D: DeviceRepository,
    S: SessionRepository,
    C: CodeRepository,
    E: TrustEventSink,
    K: Clock,
{
    pub async fn register(
        &self,
        fingerprint: Fingerprint,
        user_id: UserId,
    ) -> Result<Device, TrustServiceError> {
        self.identity.register(fingerprint, user_id).await
    }

    /// Resolve the client's token for `user_id`, registering a new device when
    /// there is none or it does not resolve. The flag is `true` for a new device.
    pub async fn register_or_resolve(
        &self,
        token: Option<&str>,
        fingerprint: Fingerprint,
        user_id: UserId,
    ) -> Result<(Device, bool), TrustServiceError> {
        match self.identity.resolve(token, user_id).await {
            Ok(Some(device)) => Ok((device, false)),
            Ok(None) | Err(TrustServiceError::DeviceNotFound) => {
                let device = self.register(fingerprint, user_id).await?;
                Ok((device, true))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, id: DeviceId, user_id: UserId) -> Result<Device, TrustServiceError> {
        self.identity.owned(id, user_id).await
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<Device>, TrustServiceError> {
        self.identity.devices.list_by_user(user_id).await
    }

    /// Start a session on `device`, containing it if the device is hijacked
    /// while the session is being created.
    pub async fn start_session(
        &self,
        device: &Device,
        user_id: UserId,
    ) -> Result<Session, TrustServiceError> {
        let session = self.sessions.start(device, user_id).await?;

        // A hijack that enumerated sessions before this one was stored would miss it.
        match self.identity.lookup(device.id).await {
            Ok(current) if current.status == DeviceStatus::Hijacked => {
                self.sessions.block(&session).await?;
                tracing::warn!(session_id = %session.id, device_id = %device.id, "session opened on hijacked device was blocked");
                Err(TrustServiceError::device_transition(current.status))
            }
            Ok(_) => Ok(session),
            Err(TrustServiceError::DeviceNotFound) => {
                self.sessions.finish_device(device.id).await?;
                Err(TrustServiceError::DeviceNotFound)
            }
            Err(e) => Err(e),
        }
    }

    /// `Active → Verified`; idempotent when already verified. A hijacked
    /// device cannot be verified.
    pub async fn verify(&self, device: &Device) -> Result<Device, TrustServiceError> {
        match self.apply(device, DeviceAction::Verify).await? {
            Applied::Moved(verified) => {
                self.emit(TrustEvent::device(
                    TrustEventKind::DeviceVerified,
                    &verified,
                    verified.updated_at,
                ))
                .await;
                Ok(verified)
            }
            Applied::Unchanged(current) => Ok(current),
        }
    }

    /// Flag the device compromised and contain every live session on it.
    ///
    /// The device flips to `Hijacked` before sessions are enumerated, so a
    /// concurrent `verify` already refuses. The cascade runs even when the
    /// device was already hijacked. `DeviceHijacked` is emitted after the
    /// cascade, and only by the call that flipped the status.
    pub async fn hijack(
        &self,
        device: &Device,
        acting_user: Option<UserId>,
    ) -> Result<Device, TrustServiceError> {
        let mut current = device.clone();
        let mut flipped = None;
        for _ in 0..CONTAINMENT_ATTEMPTS {
            match self.apply(&current, DeviceAction::Hijack).await {
                Ok(applied) => {
                    flipped = Some(applied);
                    break;
                }
                Err(TrustServiceError::TransitionConflict) => {
                    current = self.identity.lookup(device.id).await?;
                }
                Err(e) => return Err(e),
            }
        }
        let applied = flipped.ok_or(TrustServiceError::TransitionConflict)?;
        let moved = applied.is_moved();
        let hijacked = applied.into_inner();

        let mut blocked = 0usize;
        for session in self.sessions.list_for_device(hijacked.id).await? {
            if !session.status.is_live() {
                continue;
            }
            let contained = self.sessions.block(&session).await?;
            if contained.status == SessionStatus::Blocked {
                blocked += 1;
            }
        }
        tracing::warn!(
            device_id = %hijacked.id,
            user_id = %hijacked.user_id,
            actor_id = ?acting_user.map(|u| u.to_string()),
            blocked,
            "device hijack contained"
        );

        if moved {
            let mut event =
                TrustEvent::device(TrustEventKind::DeviceHijacked, &hijacked, hijacked.updated_at);
            event.actor_id = acting_user;
            self.emit(event).await;
        }
        Ok(hijacked)
    }

    /// Finish every session of the device, then delete it.
    pub async fn forget(&self, device: &Device) -> Result<(), TrustServiceError> {
        self.sessions.finish_device(device.id).await?;
        if !self.identity.devices.delete(device.id).await? {
            return Err(TrustServiceError::DeviceNotFound);
        }
        tracing::info!(device_id = %device.id, user_id = %device.user_id, "device forgotten");
        Ok(())
    }

    async fn emit(&self, event: TrustEvent) {
        crate::usecase::emit(&self.identity.events, event).await;
    }

    async fn apply(
        &self,
        device: &Device,
        action: DeviceAction,
    ) -> Result<Applied<Device>, TrustServiceError> {
        let target = match device.status.apply(action) {
            Transition::To(target) if target != device.status => target,
            Transition::To(_) | Transition::Unchanged => {
                return Ok(Applied::Unchanged(device.clone()));
            }
            Transition::Rejected => return Err(TrustServiceError::device_transition(device.status)),
        };

        let at = self.identity.clock.now();
        if self
            .identity
            .devices
            .transition(device.id, device.status, target, at)
            .await?
        {
            tracing::info!(
                device_id = %device.id,
                from = %device.status,
                to = %target,
                "device transition"
            );
            return Ok(Applied::Moved(device.moved_to(target, at)));
        }

        let current = self.identity.lookup(device.id).await?;
        tracing::debug!(
            device_id = %device.id,
            expected = %device.status,
            found = %current.status,
            "device transition lost race"
        );
        match current.status.apply(action) {
            Transition::To(target) if target != current.status => {
                Err(TrustServiceError::TransitionConflict)
            }
            Transition::To(_) | Transition::Unchanged => Ok(Applied::Unchanged(current)),
            Transition::Rejected => Err(TrustServiceError::device_transition(current.status)),
        }
    }
}
