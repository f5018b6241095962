use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use warden_domain::device::{DeviceStatus, Fingerprint};
use warden_domain::id::{DeviceId, SessionId, UserId};
use warden_domain::pagination::PageRequest;
use warden_domain::session::SessionStatus;
use warden_trust::domain::clock::Clock;
use warden_trust::domain::repository::{
    CodeRepository, DeviceRepository, SessionRepository, TrustEventSink,
};
use warden_trust::domain::types::{
    Device, Session, SessionTransition, StepUpCode, TrustEvent, TrustEventKind,
};
use warden_trust::error::TrustServiceError;
use warden_trust::usecase::auth_flow::AuthFlow;
use warden_trust::usecase::code::CodeIssuer;
use warden_trust::usecase::device::DeviceLifecycle;
use warden_trust::usecase::identity::IdentityBinding;
use warden_trust::usecase::session::SessionLifecycle;

// ── In-memory store ──────────────────────────────────────────────────────────

/// Rows shared by all mock repositories of one test, mirroring the database.
#[derive(Default)]
pub struct MemoryStore {
    pub devices: Vec<Device>,
    pub sessions: Vec<Session>,
    pub codes: Vec<StepUpCode>,
}

pub type Store = Arc<Mutex<MemoryStore>>;

fn revoke(codes: &mut [StepUpCode], subject_id: Uuid, at: DateTime<Utc>) -> u64 {
    let mut revoked = 0;
    for code in codes
        .iter_mut()
        .filter(|c| c.subject_id == subject_id && c.consumed_at.is_none())
    {
        code.consumed_at = Some(at);
        revoked += 1;
    }
    revoked
}

// ── MockDeviceRepo ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockDeviceRepo {
    pub store: Store,
}

impl DeviceRepository for MockDeviceRepo {
    async fn find(&self, id: DeviceId) -> Result<Option<Device>, TrustServiceError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        Ok(store.devices.iter().find(|d| d.id == id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Device>, TrustServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .devices
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, device: &Device) -> Result<(), TrustServiceError> {
        self.store.lock().unwrap().devices.push(device.clone());
        Ok(())
    }

    async fn transition(
        &self,
        id: DeviceId,
        from: DeviceStatus,
        to: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        let Some(device) = store
            .devices
            .iter_mut()
            .find(|d| d.id == id && d.status == from)
        else {
            return Ok(false);
        };
        *device = device.moved_to(to, at);
        Ok(true)
    }

    async fn delete(&self, id: DeviceId) -> Result<bool, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        let before = store.devices.len();
        store.devices.retain(|d| d.id != id);
        Ok(store.devices.len() < before)
    }
}

// ── MockSessionRepo ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockSessionRepo {
    pub store: Store,
}

impl SessionRepository for MockSessionRepo {
    async fn find(&self, id: SessionId) -> Result<Option<Session>, TrustServiceError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        Ok(store.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Vec<Session>, TrustServiceError> {
        let store = self.store.lock().unwrap();
        let mut sessions: Vec<Session> = store
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn list_by_device(&self, device_id: DeviceId) -> Result<Vec<Session>, TrustServiceError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        Ok(store
            .sessions
            .iter()
            .filter(|s| s.device_id == device_id)
            .cloned()
            .collect())
    }

    async fn find_open(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> Result<Option<Session>, TrustServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .sessions
            .iter()
            .filter(|s| {
                s.device_id == device_id
                    && s.user_id == user_id
                    && s.status != SessionStatus::Finished
            })
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn create(&self, session: &Session) -> Result<(), TrustServiceError> {
        self.store.lock().unwrap().sessions.push(session.clone());
        Ok(())
    }

    async fn touch(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        let Some(session) = store
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.status == SessionStatus::Active)
        else {
            return Ok(false);
        };
        session.last_activity_at = at;
        Ok(true)
    }

    async fn transition(&self, t: &SessionTransition) -> Result<bool, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        let MemoryStore {
            sessions, codes, ..
        } = &mut *store;
        let Some(session) = sessions
            .iter_mut()
            .find(|s| s.id == t.id && s.status == t.from)
        else {
            return Ok(false);
        };
        *session = session.moved_to(t.to, t.at);
        if t.revoke_codes {
            revoke(codes, t.id.0, t.at);
        }
        Ok(true)
    }

    async fn finish_all_for_device(
        &self,
        device_id: DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Vec<Session>, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        let MemoryStore {
            sessions, codes, ..
        } = &mut *store;
        let mut finished = Vec::new();
        for session in sessions
            .iter_mut()
            .filter(|s| s.device_id == device_id && s.status != SessionStatus::Finished)
        {
            *session = session.moved_to(SessionStatus::Finished, at);
            revoke(codes, session.id.0, at);
            finished.push(session.clone());
        }
        Ok(finished)
    }
}

// ── MockCodeRepo ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockCodeRepo {
    pub store: Store,
    /// Make `replace` fail, as a broken database would.
    pub fail_writes: bool,
    /// Yield this many times before `replace` writes, so other tasks run
    /// while a code is being issued.
    pub replace_yields: usize,
}

impl CodeRepository for MockCodeRepo {
    async fn replace(&self, code: &StepUpCode) -> Result<(), TrustServiceError> {
        if self.fail_writes {
            return Err(TrustServiceError::Internal(anyhow::anyhow!("code store unavailable")));
        }
        for _ in 0..self.replace_yields {
            tokio::task::yield_now().await;
        }
        let mut store = self.store.lock().unwrap();
        revoke(&mut store.codes, code.subject_id, code.issued_at);
        store.codes.push(code.clone());
        Ok(())
    }

    async fn find_outstanding(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<StepUpCode>, TrustServiceError> {
        let found = {
            let store = self.store.lock().unwrap();
            store
                .codes
                .iter()
                .filter(|c| c.subject_id == subject_id && c.is_valid(now))
                .max_by_key(|c| c.issued_at)
                .cloned()
        };
        // Let a concurrent validation read the same row before either consumes it.
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        let Some(code) = store
            .codes
            .iter_mut()
            .find(|c| c.id == id && c.is_valid(at))
        else {
            return Ok(false);
        };
        code.consumed_at = Some(at);
        Ok(true)
    }

    async fn consume_all(
        &self,
        subject_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, TrustServiceError> {
        let mut store = self.store.lock().unwrap();
        Ok(revoke(&mut store.codes, subject_id, at))
    }
}

// ── Event sinks ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingEventSink {
    pub events: Arc<Mutex<Vec<TrustEvent>>>,
}

impl RecordingEventSink {
    pub fn kinds(&self) -> Vec<TrustEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: TrustEventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl TrustEventSink for RecordingEventSink {
    async fn publish(&self, event: &TrustEvent) -> Result<(), TrustServiceError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FailingEventSink;

impl TrustEventSink for FailingEventSink {
    async fn publish(&self, _event: &TrustEvent) -> Result<(), TrustServiceError> {
        Err(TrustServiceError::Internal(anyhow::anyhow!("sink unavailable")))
    }
}

// ── TestClock ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TestClock {
    pub now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(
                Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
            )),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ── Code generator ───────────────────────────────────────────────────────────

static NEXT_CODE: AtomicU32 = AtomicU32::new(100_000);

/// Distinct six-digit codes, so a superseded code never equals its successor.
pub fn sequential_code() -> String {
    format!("{:06}", NEXT_CODE.fetch_add(1, Ordering::Relaxed) % 1_000_000)
}

/// A six-digit value guaranteed to differ from `code`.
pub fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect()
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub type TestSessions<E = RecordingEventSink> =
    SessionLifecycle<MockSessionRepo, MockCodeRepo, E, TestClock>;

pub type TestDevices<E = RecordingEventSink> =
    DeviceLifecycle<MockDeviceRepo, MockSessionRepo, MockCodeRepo, E, TestClock>;

pub type TestFlow = AuthFlow<MockDeviceRepo, MockSessionRepo, MockCodeRepo, RecordingEventSink, TestClock>;

/// Wires every component against one shared store.
pub struct Harness {
    pub store: Store,
    pub events: RecordingEventSink,
    pub clock: TestClock,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(MemoryStore::default())),
            events: RecordingEventSink::default(),
            clock: TestClock::new(),
        }
    }

    pub fn code_repo(&self) -> MockCodeRepo {
        MockCodeRepo {
            store: Arc::clone(&self.store),
            fail_writes: false,
            replace_yields: 0,
        }
    }

    pub fn issuer(&self) -> CodeIssuer<MockCodeRepo, TestClock> {
        self.issuer_with(self.code_repo())
    }

    pub fn issuer_with(&self, codes: MockCodeRepo) -> CodeIssuer<MockCodeRepo, TestClock> {
        CodeIssuer {
            generate: sequential_code,
            ..CodeIssuer::new(codes, self.clock.clone())
        }
    }

    pub fn sessions(&self) -> TestSessions {
        self.sessions_with(self.events.clone(), self.code_repo())
    }

    pub fn sessions_with<E: TrustEventSink>(&self, events: E, codes: MockCodeRepo) -> TestSessions<E> {
        SessionLifecycle {
            sessions: MockSessionRepo {
                store: Arc::clone(&self.store),
            },
            issuer: self.issuer_with(codes),
            events,
            clock: self.clock.clone(),
        }
    }

    pub fn identity(&self) -> IdentityBinding<MockDeviceRepo, RecordingEventSink, TestClock> {
        IdentityBinding {
            devices: MockDeviceRepo {
                store: Arc::clone(&self.store),
            },
            events: self.events.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn devices(&self) -> TestDevices {
        self.devices_with(self.events.clone())
    }

    pub fn devices_with<E: TrustEventSink + Clone>(&self, events: E) -> TestDevices<E> {
        self.devices_with_codes(events, self.code_repo())
    }

    pub fn devices_with_codes<E: TrustEventSink + Clone>(
        &self,
        events: E,
        codes: MockCodeRepo,
    ) -> TestDevices<E> {
        DeviceLifecycle {
            identity: IdentityBinding {
                devices: MockDeviceRepo {
                    store: Arc::clone(&self.store),
                },
                events: events.clone(),
                clock: self.clock.clone(),
            },
            sessions: self.sessions_with(events, codes),
        }
    }

    pub fn flow(&self) -> TestFlow {
        AuthFlow {
            lifecycle: self.devices(),
        }
    }

    // ── Fixtures ──

    pub fn seed_device(&self, user_id: UserId, status: DeviceStatus) -> Device {
        let now = self.clock.now();
        let device = Device {
            id: DeviceId::generate(),
            user_id,
            status,
            fingerprint: test_fingerprint(),
            created_at: now,
            updated_at: now,
            verified_at: (status == DeviceStatus::Verified).then_some(now),
            hijacked_at: (status == DeviceStatus::Hijacked).then_some(now),
        };
        self.store.lock().unwrap().devices.push(device.clone());
        device
    }

    pub fn seed_session(&self, device: &Device, status: SessionStatus) -> Session {
        let now = self.clock.now();
        let session = Session {
            id: SessionId::generate(),
            device_id: device.id,
            user_id: device.user_id,
            status,
            created_at: now,
            last_activity_at: now,
            finished_at: (status == SessionStatus::Finished).then_some(now),
        };
        self.store.lock().unwrap().sessions.push(session.clone());
        session
    }

    pub fn session(&self, id: SessionId) -> Session {
        self.store
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .expect("session exists")
    }

    pub fn device(&self, id: DeviceId) -> Option<Device> {
        self.store
            .lock()
            .unwrap()
            .devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    pub fn outstanding_codes(&self, subject_id: Uuid) -> Vec<StepUpCode> {
        let now = self.clock.now();
        self.store
            .lock()
            .unwrap()
            .codes
            .iter()
            .filter(|c| c.subject_id == subject_id && c.is_valid(now))
            .cloned()
            .collect()
    }
}

pub fn test_user() -> UserId {
    UserId(Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap())
}

pub fn other_user() -> UserId {
    UserId(Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap())
}

pub fn test_fingerprint() -> Fingerprint {
    Fingerprint {
        browser: "Firefox".to_owned(),
        browser_version: "131.0".to_owned(),
        platform: "Linux".to_owned(),
        device: "desktop".to_owned(),
        device_type: "desktop".to_owned(),
        ip: "203.0.113.7".to_owned(),
        source: "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0"
            .to_owned(),
        ..Fingerprint::default()
    }
}
