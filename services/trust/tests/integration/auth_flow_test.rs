use warden_domain::device::DeviceStatus;
use warden_domain::session::SessionStatus;
use warden_trust::domain::types::TrustEventKind;
use warden_trust::error::TrustServiceError;

use crate::helpers::{Harness, other_user, test_fingerprint, test_user};

// ── on_login ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_register_device_and_start_session_on_first_login() {
    let h = Harness::new();

    let outcome = h
        .flow()
        .on_login(None, test_fingerprint(), test_user())
        .await
        .unwrap();

    assert!(outcome.device_registered);
    assert_eq!(outcome.device.status, DeviceStatus::Active);
    assert_eq!(outcome.session.status, SessionStatus::Active);
    assert_eq!(outcome.session.device_id, outcome.device.id);
    assert_eq!(h.events.kinds(), vec![TrustEventKind::DeviceCreated]);
}

#[tokio::test]
async fn should_reuse_device_and_session_on_repeated_login() {
    let h = Harness::new();
    let flow = h.flow();
    let first = flow
        .on_login(None, test_fingerprint(), test_user())
        .await
        .unwrap();
    let token = first.device.id.to_string();

    let second = flow
        .on_login(Some(&token), test_fingerprint(), test_user())
        .await
        .unwrap();

    assert!(!second.device_registered);
    assert_eq!(second.device.id, first.device.id);
    assert_eq!(second.session.id, first.session.id);
    assert_eq!(h.store.lock().unwrap().devices.len(), 1);
}

#[tokio::test]
async fn should_register_new_device_for_another_users_token() {
    let h = Harness::new();
    let theirs = h.seed_device(other_user(), DeviceStatus::Verified);
    let token = theirs.id.to_string();

    let outcome = h
        .flow()
        .on_login(Some(&token), test_fingerprint(), test_user())
        .await
        .unwrap();

    assert!(outcome.device_registered);
    assert_ne!(outcome.device.id, theirs.id);
    assert_eq!(outcome.device.user_id, test_user());
}

#[tokio::test]
async fn should_refuse_login_on_hijacked_device() {
    let h = Harness::new();
    let device = h.seed_device(test_user(), DeviceStatus::Hijacked);
    let token = device.id.to_string();

    let result = h
        .flow()
        .on_login(Some(&token), test_fingerprint(), test_user())
        .await;

    assert!(
        matches!(result, Err(TrustServiceError::InvalidTransition { entity: "device", .. })),
        "expected InvalidTransition, got {result:?}"
    );
    assert!(h.store.lock().unwrap().sessions.is_empty());
}

// ── on_logout ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_finish_session_on_logout() {
    let h = Harness::new();
    let flow = h.flow();
    let login = flow
        .on_login(None, test_fingerprint(), test_user())
        .await
        .unwrap();

    let ended = flow
        .on_logout(login.session.id, test_user(), false)
        .await
        .unwrap();

    assert_eq!(ended.status, SessionStatus::Finished);
    assert!(h.device(login.device.id).is_some());
}

#[tokio::test]
async fn should_finish_every_device_session_on_logout_with_forget() {
    let h = Harness::new();
    let device = h.seed_device(test_user(), DeviceStatus::Active);
    let current = h.seed_session(&device, SessionStatus::Active);
    let other = h.seed_session(&device, SessionStatus::Locked);

    h.flow()
        .on_logout(current.id, test_user(), true)
        .await
        .unwrap();

    assert_eq!(h.session(current.id).status, SessionStatus::Finished);
    assert_eq!(h.session(other.id).status, SessionStatus::Finished);
}

#[tokio::test]
async fn should_refuse_logout_of_another_users_session() {
    let h = Harness::new();
    let device = h.seed_device(other_user(), DeviceStatus::Active);
    let session = h.seed_session(&device, SessionStatus::Active);

    let result = h.flow().on_logout(session.id, test_user(), false).await;

    assert!(
        matches!(result, Err(TrustServiceError::SessionNotFound)),
        "expected SessionNotFound, got {result:?}"
    );
    assert_eq!(h.session(session.id).status, SessionStatus::Active);
}

// ── on_step_up ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_verify_device_and_unlock_session_on_step_up() {
    let h = Harness::new();
    let device = h.seed_device(test_user(), DeviceStatus::Active);
    let session = h.seed_session(&device, SessionStatus::Active);
    let flow = h.flow();
    flow.lifecycle
        .sessions
        .lock_by_code(&session)
        .await
        .unwrap()
        .unwrap();

    let outcome = flow
        .on_step_up(device.id, session.id, test_user())
        .await
        .unwrap();
    let repeated = flow
        .on_step_up(device.id, session.id, test_user())
        .await
        .unwrap();

    assert_eq!(outcome.device.status, DeviceStatus::Verified);
    assert!(outcome.session_unlocked);
    assert!(!repeated.session_unlocked);
    assert_eq!(h.session(session.id).status, SessionStatus::Active);
    assert!(h.outstanding_codes(session.id.0).is_empty());
    assert_eq!(h.events.count(TrustEventKind::DeviceVerified), 1);
    assert_eq!(h.events.count(TrustEventKind::SessionUnlocked), 1);
}

#[tokio::test]
async fn should_refuse_step_up_for_session_on_another_device() {
    let h = Harness::new();
    let device = h.seed_device(test_user(), DeviceStatus::Active);
    let elsewhere = h.seed_device(test_user(), DeviceStatus::Active);
    let session = h.seed_session(&elsewhere, SessionStatus::Locked);

    let result = h.flow().on_step_up(device.id, session.id, test_user()).await;

    assert!(
        matches!(result, Err(TrustServiceError::SessionNotFound)),
        "expected SessionNotFound, got {result:?}"
    );
    assert_eq!(h.device(device.id).unwrap().status, DeviceStatus::Active);
    assert_eq!(h.session(session.id).status, SessionStatus::Locked);
}

#[tokio::test]
async fn should_refuse_step_up_on_hijacked_device() {
    let h = Harness::new();
    let device = h.seed_device(test_user(), DeviceStatus::Hijacked);
    let session = h.seed_session(&device, SessionStatus::Blocked);

    let result = h.flow().on_step_up(device.id, session.id, test_user()).await;

    assert!(
        matches!(result, Err(TrustServiceError::InvalidTransition { .. })),
        "expected InvalidTransition, got {result:?}"
    );
    assert_eq!(h.session(session.id).status, SessionStatus::Blocked);
}

// ── on_anomaly ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_hijack_device_on_anomaly_with_actor() {
    let h = Harness::new();
    let device = h.seed_device(test_user(), DeviceStatus::Verified);
    let session = h.seed_session(&device, SessionStatus::Active);

    let hijacked = h
        .flow()
        .on_anomaly(device.id, Some(other_user()))
        .await
        .unwrap();

    assert_eq!(hijacked.status, DeviceStatus::Hijacked);
    assert_eq!(h.session(session.id).status, SessionStatus::Blocked);
    let events = h.events.events.lock().unwrap();
    let event = events
        .iter()
        .find(|e| e.kind == TrustEventKind::DeviceHijacked)
        .expect("hijack event");
    assert_eq!(event.user_id, test_user());
    assert_eq!(event.actor_id, Some(other_user()));
}

#[tokio::test]
async fn should_report_unknown_device_on_anomaly() {
    let h = Harness::new();

    let result = h
        .flow()
        .on_anomaly(warden_domain::id::DeviceId::generate(), None)
        .await;

    assert!(
        matches!(result, Err(TrustServiceError::DeviceNotFound)),
        "expected DeviceNotFound, got {result:?}"
    );
}
