use chrono::{Duration, TimeZone, Utc};

use crate::domain::entities::{SessionStatus, VerificationSession};

fn session() -> VerificationSession {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    VerificationSession::new(
        "+15551234567",
        "012345",
        0,
        t0,
        t0 + Duration::seconds(30),
        t0 + Duration::seconds(300),
    )
}

#[test]
fn test_new_session_is_pending() {
    let session = session();
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.step_index, 0);
    assert_eq!(session.attempt_count, 0);
    assert_eq!(session.version, 0);
    assert!(!session.is_terminal());
}

#[test]
fn test_deadlines_are_inclusive() {
    let session = session();
    assert!(!session.is_step_due_at(session.step_deadline - Duration::milliseconds(1)));
    assert!(session.is_step_due_at(session.step_deadline));
    assert!(session.is_expired_at(session.session_deadline));
    assert_eq!(session.next_deadline(), session.step_deadline);
}

#[test]
fn test_terminal_status_is_sticky() {
    let mut session = session();
    session.mark_verified();
    assert_eq!(session.status, SessionStatus::Verified);

    session.expire();
    session.exhaust_attempts();
    session.exhaust_steps(3);
    session.escalate_to(1, "999999".into(), session.step_deadline);
    assert_eq!(session.record_attempt(), 0);

    assert_eq!(session.status, SessionStatus::Verified);
    assert_eq!(session.step_index, 0);
    assert_eq!(session.current_code, "012345");
}

#[test]
fn test_escalation_never_moves_backwards() {
    let mut session = session();
    let deadline = session.step_deadline + Duration::seconds(60);
    session.escalate_to(2, "111111".into(), deadline);
    assert_eq!(session.step_index, 2);

    session.escalate_to(1, "222222".into(), deadline);
    assert_eq!(session.step_index, 2);
    assert_eq!(session.current_code, "111111");
}

#[test]
fn test_exhaust_steps_points_past_last() {
    let mut session = session();
    session.exhaust_steps(2);
    assert_eq!(session.status, SessionStatus::Exhausted);
    assert_eq!(session.step_index, 2);
}

#[test]
fn test_debug_output_redacts_code() {
    let rendered = format!("{:?}", session());
    assert!(!rendered.contains("012345"));
    assert!(rendered.contains("<redacted>"));
    assert!(!rendered.contains("+15551234567"));
}

#[test]
fn test_session_serde_keeps_status_lowercase() {
    let json = serde_json::to_value(session()).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["current_code"], "012345");
}
