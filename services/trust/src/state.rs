use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::domain::clock::SystemClock;
use crate::infra::db::{DbCodeRepository, DbDeviceRepository, DbSessionRepository};
use crate::infra::events::{EventSink, EventSinkKind};
use crate::usecase::auth_flow::AuthFlow;
use crate::usecase::code::CodeIssuer;
use crate::usecase::device::DeviceLifecycle;
use crate::usecase::identity::IdentityBinding;
use crate::usecase::session::SessionLifecycle;

pub type Sessions =
    SessionLifecycle<DbSessionRepository, DbCodeRepository, EventSink, SystemClock>;

pub type Devices = DeviceLifecycle<
    DbDeviceRepository,
    DbSessionRepository,
    DbCodeRepository,
    EventSink,
    SystemClock,
>;

pub type Flow =
    AuthFlow<DbDeviceRepository, DbSessionRepository, DbCodeRepository, EventSink, SystemClock>;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cookie_domain: String,
    pub code_ttl: Duration,
    pub expose_lock_codes: bool,
    pub event_sink: EventSinkKind,
}

impl AppState {
    pub fn device_repo(&self) -> DbDeviceRepository {
        DbDeviceRepository {
            db: self.db.clone(),
        }
    }

    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }

    pub fn code_repo(&self) -> DbCodeRepository {
        DbCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn events(&self) -> EventSink {
        EventSink::new(self.event_sink, &self.db)
    }

    pub fn code_issuer(&self) -> CodeIssuer<DbCodeRepository, SystemClock> {
        CodeIssuer {
            ttl: self.code_ttl,
            ..CodeIssuer::new(self.code_repo(), SystemClock)
        }
    }

    pub fn sessions(&self) -> Sessions {
        SessionLifecycle {
            sessions: self.session_repo(),
            issuer: self.code_issuer(),
            events: self.events(),
            clock: SystemClock,
        }
    }

    pub fn devices(&self) -> Devices {
        DeviceLifecycle {
            identity: IdentityBinding {
                devices: self.device_repo(),
                events: self.events(),
                clock: SystemClock,
            },
            sessions: self.sessions(),
        }
    }

    pub fn auth_flow(&self) -> Flow {
        AuthFlow {
            lifecycle: self.devices(),
        }
    }
}
