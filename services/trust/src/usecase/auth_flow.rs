use warden_domain::device::Fingerprint;
use warden_domain::id::{DeviceId, SessionId, UserId};

use crate::domain::clock::Clock;
use crate::domain::repository::{CodeRepository, DeviceRepository, SessionRepository, TrustEventSink};
use crate::domain::types::{Device, Session};
use crate::error::TrustServiceError;
use crate::usecase::device::DeviceLifecycle;

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub device: Device,
    pub session: Session,
    /// The client presented no usable token and a device was created.
    pub device_registered: bool,
}

#[derive(Debug, Clone)]
pub struct StepUpOutcome {
    pub device: Device,
    pub session_unlocked: bool,
}

/// Hooks the authentication flow calls after primary login, logout,
/// step-up verification and external anomaly detection.
pub struct AuthFlow<D, S, C, E, K>
where
    D: DeviceRepository,
    S: SessionRepository,
    C: CodeRepository,
    E: TrustEventSink,
    K: Clock,
{
    pub lifecycle: DeviceLifecycle<D, S, C, E, K>,
}

impl<D, S, C, E, K> AuthFlow<D, S, C, E, K>
where
    D: DeviceRepository,
    S: SessionRepository,
    C: CodeRepository,
    E: TrustEventSink,
    K: Clock,
{
    pub async fn on_login(
        &self,
        device_token: Option<&str>,
        fingerprint: Fingerprint,
        user_id: UserId,
    ) -> Result<LoginOutcome, TrustServiceError> {
        let (device, device_registered) = self
            .lifecycle
            .register_or_resolve(device_token, fingerprint, user_id)
            .await?;
        let session = self.lifecycle.start_session(&device, user_id).await?;
        Ok(LoginOutcome {
            device,
            session,
            device_registered,
        })
    }

    pub async fn on_logout(
        &self,
        session_id: SessionId,
        user_id: UserId,
        forget_device: bool,
    ) -> Result<Session, TrustServiceError> {
        let sessions = &self.lifecycle.sessions;
        let session = sessions.get(session_id, user_id).await?;
        sessions.end(&session, forget_device).await
    }

    /// Step-up success implies trust: the device is verified and the session
    /// unlocked without the lock code.
    pub async fn on_step_up(
        &self,
        device_id: DeviceId,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<StepUpOutcome, TrustServiceError> {
        let device = self.lifecycle.get(device_id, user_id).await?;
        let session = self.lifecycle.sessions.get(session_id, user_id).await?;
        if session.device_id != device.id {
            return Err(TrustServiceError::SessionNotFound);
        }
        let device = self.lifecycle.verify(&device).await?;
        let session_unlocked = self.lifecycle.sessions.unlock_after_step_up(&session).await?;
        Ok(StepUpOutcome {
            device,
            session_unlocked,
        })
    }

    pub async fn on_anomaly(
        &self,
        device_id: DeviceId,
        acting_user: Option<UserId>,
    ) -> Result<Device, TrustServiceError> {
        let device = self.lifecycle.identity.lookup(device_id).await?;
        self.lifecycle.hijack(&device, acting_user).await
    }
}
