use warden_domain::device::DeviceStatus;
use warden_domain::id::{DeviceId, SessionId, UserId};
use warden_domain::pagination::PageRequest;
use warden_domain::session::{SessionAction, SessionStatus};
use warden_domain::transition::Transition;

use crate::domain::clock::Clock;
use crate::domain::repository::{CodeRepository, SessionRepository, TrustEventSink};
use crate::domain::types::{
    Applied, CONTAINMENT_ATTEMPTS, Device, IssuedCode, Session, SessionTransition, TrustEvent,
    TrustEventKind,
};
use crate::error::TrustServiceError;
use crate::usecase::code::CodeIssuer;
use crate::usecase::emit;

/// Owns session status transitions and the lock/unlock/refresh code protocol.
///
/// Every status change is a compare-and-set on the stored status. A caller
/// that loses the race gets the outcome the action has against the status
/// that won: a no-op, `InvalidTransition`, or `TransitionConflict`.
pub struct SessionLifecycle<S, C, E, K>
where
    S: SessionRepository,
    C: CodeRepository,
    E: TrustEventSink,
    K: Clock,
{
    pub sessions: S,
    pub issuer: CodeIssuer<C, K>,
    pub events: E,
    pub clock: K,
}

impl<S, C, E, K> SessionLifecycle<S, C, E, K>
where
    S: SessionRepository,
    C: CodeRepository,
    E: TrustEventSink,
    K: Clock,
{
    /// Session `id` as seen by `user_id`. Another user's session is reported as missing.
    pub async fn get(&self, id: SessionId, user_id: UserId) -> Result<Session, TrustServiceError> {
        self.sessions
            .find(id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(TrustServiceError::SessionNotFound)
    }

    pub async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Vec<Session>, TrustServiceError> {
        self.sessions.list_by_user(user_id, page.clamped()).await
    }

    pub async fn list_for_device(
        &self,
        device_id: DeviceId,
    ) -> Result<Vec<Session>, TrustServiceError> {
        self.sessions.list_by_device(device_id).await
    }

    /// Open a session for `user_id` on `device`.
    ///
    /// An existing `Active` session for the pair is reused and touched. An
    /// existing `Locked` or `Blocked` one must be resolved first.
    pub async fn start(&self, device: &Device, user_id: UserId) -> Result<Session, TrustServiceError> {
        if device.user_id != user_id {
            return Err(TrustServiceError::DeviceNotFound);
        }
        if device.status == DeviceStatus::Hijacked {
            return Err(TrustServiceError::device_transition(device.status));
        }

        let now = self.clock.now();
        if let Some(open) = self.sessions.find_open(device.id, user_id).await? {
            return match open.status {
                SessionStatus::Active => {
                    if !self.sessions.touch(open.id, now).await? {
                        return Err(TrustServiceError::TransitionConflict);
                    }
                    tracing::debug!(session_id = %open.id, "reusing active session");
                    Ok(Session {
                        last_activity_at: now,
                        ..open
                    })
                }
                status => Err(TrustServiceError::session_transition(status)),
            };
        }

        let session = Session {
            id: SessionId::generate(),
            device_id: device.id,
            user_id,
            status: SessionStatus::Active,
            created_at: now,
            last_activity_at: now,
            finished_at: None,
        };
        self.sessions.create(&session).await?;
        tracing::info!(session_id = %session.id, device_id = %device.id, "session started");
        Ok(session)
    }

    /// `Active|Locked → Finished`; idempotent once finished. A blocked session
    /// can only be finished through `forget`.
    ///
    /// With `forget_device`, every other session of the same device is finished too.
    pub async fn end(
        &self,
        session: &Session,
        forget_device: bool,
    ) -> Result<Session, TrustServiceError> {
        let ended = match self.apply(session, SessionAction::End).await? {
            Applied::Moved(s) => {
                let at = s.finished_at.unwrap_or(s.last_activity_at);
                emit(
                    &self.events,
                    TrustEvent::session(TrustEventKind::SessionEnded, &s, at),
                )
                .await;
                s
            }
            Applied::Unchanged(s) => s,
        };
        if forget_device {
            self.finish_device(ended.device_id).await?;
        }
        Ok(ended)
    }

    /// `Active → Locked` plus a fresh code. `None` when the session is not
    /// `Active`, or when it left `Locked` before the code was stored.
    pub async fn lock_by_code(&self, session: &Session) -> Result<Option<IssuedCode>, TrustServiceError> {
        let locked = match self.apply(session, SessionAction::Lock).await? {
            Applied::Moved(s) => s,
            Applied::Unchanged(_) => return Ok(None),
        };

        let code = match self.issuer.issue(locked.id.0).await {
            Ok(code) => code,
            Err(e) => {
                // A locked session without a code could never be unlocked.
                let rollback = SessionTransition {
                    id: locked.id,
                    from: SessionStatus::Locked,
                    to: SessionStatus::Active,
                    at: self.clock.now(),
                    revoke_codes: true,
                };
                if let Err(rollback_err) = self.sessions.transition(&rollback).await {
                    tracing::error!(
                        session_id = %locked.id,
                        error = %rollback_err,
                        "failed to roll back lock after code issue failure"
                    );
                }
                return Err(e);
            }
        };

        let Some(issued) = self.confirm_locked(locked.id, code).await? else {
            return Ok(None);
        };
        emit(
            &self.events,
            TrustEvent::session(TrustEventKind::SessionLocked, &issued.session, self.clock.now()),
        )
        .await;
        Ok(Some(issued))
    }

    /// `Locked → Active` when `submitted` matches the outstanding code.
    ///
    /// Returns `false` without consulting the code store when the session is
    /// not `Locked`.
    pub async fn unlock_by_code(
        &self,
        session: &Session,
        submitted: &str,
    ) -> Result<bool, TrustServiceError> {
        if session.status != SessionStatus::Locked {
            return Ok(false);
        }
        if !self.issuer.validate(session.id.0, submitted).await? {
            return Ok(false);
        }
        match self.apply(session, SessionAction::Unlock).await? {
            Applied::Moved(s) => {
                emit(
                    &self.events,
                    TrustEvent::session(TrustEventKind::SessionUnlocked, &s, s.last_activity_at),
                )
                .await;
                Ok(true)
            }
            Applied::Unchanged(s) => {
                tracing::debug!(session_id = %s.id, status = %s.status, "code consumed but session moved on");
                Ok(false)
            }
        }
    }

    /// New code for a `Locked` session, superseding the previous one.
    /// `None` when the session is not `Locked`.
    pub async fn refresh_code(&self, session: &Session) -> Result<Option<IssuedCode>, TrustServiceError> {
        if !matches!(
            session.status.apply(SessionAction::RefreshCode),
            Transition::To(SessionStatus::Locked)
        ) {
            return Ok(None);
        }
        let code = self.issuer.issue(session.id.0).await?;
        self.confirm_locked(session.id, code).await
    }

    /// Re-reads the session after a code was stored for it. A transition out
    /// of `Locked` that committed during `issue` revoked nothing, so the new
    /// code is revoked here.
    async fn confirm_locked(
        &self,
        id: SessionId,
        code: String,
    ) -> Result<Option<IssuedCode>, TrustServiceError> {
        let current = self.reload(id).await?;
        if current.status != SessionStatus::Locked {
            tracing::debug!(session_id = %id, status = %current.status, "session left locked while code was issued");
            self.issuer.invalidate(id.0).await?;
            return Ok(None);
        }
        Ok(Some(IssuedCode { session: current, code }))
    }

    /// `Locked → Active` after a successful step-up, without a code. Revokes
    /// any outstanding code. Returns `false` if the session was not `Locked`.
    pub async fn unlock_after_step_up(&self, session: &Session) -> Result<bool, TrustServiceError> {
        match self.apply(session, SessionAction::Unlock).await? {
            Applied::Moved(s) => {
                emit(
                    &self.events,
                    TrustEvent::session(TrustEventKind::SessionUnlocked, &s, s.last_activity_at),
                )
                .await;
                Ok(true)
            }
            Applied::Unchanged(_) => Ok(false),
        }
    }

    /// Hijack containment: `Active|Locked → Blocked`, revoking the code in the
    /// same unit of work. Re-attempts lost races so containment holds on return.
    pub(crate) async fn block(&self, session: &Session) -> Result<Session, TrustServiceError> {
        let mut current = session.clone();
        for _ in 0..CONTAINMENT_ATTEMPTS {
            match self.apply(&current, SessionAction::Block).await {
                Ok(applied) => return Ok(applied.into_inner()),
                Err(TrustServiceError::TransitionConflict) => {
                    current = self.reload(session.id).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Err(TrustServiceError::TransitionConflict)
    }

    /// Finish every non-finished session of a device regardless of status.
    pub async fn finish_device(&self, device_id: DeviceId) -> Result<Vec<Session>, TrustServiceError> {
        let finished = self
            .sessions
            .finish_all_for_device(device_id, self.clock.now())
            .await?;
        if !finished.is_empty() {
            tracing::info!(%device_id, count = finished.len(), "device sessions finished");
        }
        for session in &finished {
            emit(
                &self.events,
                TrustEvent::session(
                    TrustEventKind::SessionEnded,
                    session,
                    session.finished_at.unwrap_or(session.last_activity_at),
                ),
            )
            .await;
        }
        Ok(finished)
    }

    async fn reload(&self, id: SessionId) -> Result<Session, TrustServiceError> {
        self.sessions
            .find(id)
            .await?
            .ok_or(TrustServiceError::SessionNotFound)
    }

    async fn apply(
        &self,
        session: &Session,
        action: SessionAction,
    ) -> Result<Applied<Session>, TrustServiceError> {
        let target = match session.status.apply(action) {
            Transition::To(target) if target != session.status => target,
            Transition::To(_) | Transition::Unchanged => {
                return Ok(Applied::Unchanged(session.clone()));
            }
            Transition::Rejected => {
                return Err(TrustServiceError::session_transition(session.status));
            }
        };

        let at = self.clock.now();
        let transition = SessionTransition {
            id: session.id,
            from: session.status,
            to: target,
            at,
            revoke_codes: target != SessionStatus::Locked,
        };
        if self.sessions.transition(&transition).await? {
            tracing::info!(
                session_id = %session.id,
                from = %session.status,
                to = %target,
                "session transition"
            );
            return Ok(Applied::Moved(session.moved_to(target, at)));
        }

        let current = self.reload(session.id).await?;
        tracing::debug!(
            session_id = %session.id,
            expected = %session.status,
            found = %current.status,
            "session transition lost race"
        );
        match current.status.apply(action) {
            Transition::To(target) if target != current.status => {
                Err(TrustServiceError::TransitionConflict)
            }
            Transition::To(_) | Transition::Unchanged => Ok(Applied::Unchanged(current)),
            Transition::Rejected => Err(TrustServiceError::session_transition(current.status)),
        }
    }
}
