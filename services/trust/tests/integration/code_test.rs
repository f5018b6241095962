use chrono::Duration;
use uuid::Uuid;

use crate::helpers::{Harness, wrong_code};

#[tokio::test]
async fn should_validate_issued_code_exactly_once() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();

    let code = issuer.issue(subject).await.unwrap();

    assert!(issuer.validate(subject, &code).await.unwrap());
    assert!(
        !issuer.validate(subject, &code).await.unwrap(),
        "a consumed code must not validate again"
    );
}

#[tokio::test]
async fn should_reject_mismatch_without_consuming_real_code() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();
    let code = issuer.issue(subject).await.unwrap();

    assert!(!issuer.validate(subject, &wrong_code(&code)).await.unwrap());
    assert!(!issuer.validate(subject, "").await.unwrap());
    assert_eq!(h.outstanding_codes(subject).len(), 1);

    assert!(issuer.validate(subject, &code).await.unwrap());
}

#[tokio::test]
async fn should_supersede_previous_code_on_issue() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();

    let first = issuer.issue(subject).await.unwrap();
    let second = issuer.issue(subject).await.unwrap();
    assert_ne!(first, second);

    let outstanding = h.outstanding_codes(subject);
    assert_eq!(outstanding.len(), 1, "at most one outstanding code per subject");
    assert_eq!(outstanding[0].code, second);

    assert!(!issuer.validate(subject, &first).await.unwrap());
    assert!(issuer.validate(subject, &second).await.unwrap());
}

#[tokio::test]
async fn should_reject_expired_code() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();
    let code = issuer.issue(subject).await.unwrap();

    h.clock.advance(Duration::seconds(600));

    assert!(!issuer.validate(subject, &code).await.unwrap());
}

#[tokio::test]
async fn should_accept_code_just_before_expiry() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();
    let code = issuer.issue(subject).await.unwrap();

    h.clock.advance(Duration::seconds(599));

    assert!(issuer.validate(subject, &code).await.unwrap());
}

#[tokio::test]
async fn should_fail_closed_when_no_code_on_record() {
    let h = Harness::new();
    assert!(!h.issuer().validate(Uuid::now_v7(), "123456").await.unwrap());
}

#[tokio::test]
async fn should_not_validate_code_for_another_subject() {
    let h = Harness::new();
    let issuer = h.issuer();
    let code = issuer.issue(Uuid::now_v7()).await.unwrap();

    assert!(!issuer.validate(Uuid::now_v7(), &code).await.unwrap());
}

#[tokio::test]
async fn should_invalidate_outstanding_code() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();
    let code = issuer.issue(subject).await.unwrap();

    issuer.invalidate(subject).await.unwrap();

    assert!(h.outstanding_codes(subject).is_empty());
    assert!(!issuer.validate(subject, &code).await.unwrap());
}

#[tokio::test]
async fn should_accept_only_one_of_two_concurrent_validations() {
    let h = Harness::new();
    let issuer = h.issuer();
    let subject = Uuid::now_v7();
    let code = issuer.issue(subject).await.unwrap();

    let (a, b) = tokio::join!(issuer.validate(subject, &code), issuer.validate(subject, &code));

    let accepted = [a.unwrap(), b.unwrap()].into_iter().filter(|ok| *ok).count();
    assert_eq!(accepted, 1, "exactly one concurrent validation may succeed");
}
