use chrono::Duration as ChronoDuration;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::entities::{Channel, SessionStatus};
use crate::domain::value_objects::MatchResult;
use crate::errors::{DeliveryError, DomainError};
use crate::repositories::{InMemorySessionStore, ScriptedSessionStore, SessionStore};
use crate::services::code_generator::CodeGenerator;
use crate::services::delivery::DeliveryRegistry;
use crate::services::escalation::{CodePolicy, EscalationConfig, EscalationEngine, StrategyTable};
use crate::services::test_support::{fast_config, sms_voice, sms_whatsapp_voice, Harness, DESTINATION};
use crate::services::verification::VerificationGate;

#[tokio::test]
async fn test_start_creates_pending_session_on_first_step() {
    let h = Harness::new(sms_voice(), fast_config());
    let handle = h.engine.start(DESTINATION, &CancellationToken::new()).await.unwrap();

    assert_eq!(handle.status, SessionStatus::Pending);
    assert_eq!(handle.step_index, 0);
    assert_eq!(handle.channel, Some(Channel::Sms));

    let session = h.session(handle.session_id).await;
    assert_eq!(session.step_deadline, session.created_at + ChronoDuration::seconds(30));
    assert_eq!(session.session_deadline, session.created_at + ChronoDuration::seconds(300));
    assert_eq!(session.attempt_count, 0);

    let sent = h.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, DESTINATION);
    assert_eq!(sent[0].code, session.current_code);
    assert_eq!(h.voice.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_retries_transient_failures_on_same_step() {
    let h = Harness::new(sms_voice(), fast_config());
    h.sms.push_outcome(Err(DeliveryError::Transient("throttled".into())));
    h.sms.push_outcome(Err(DeliveryError::Transient("throttled".into())));

    let handle = h.engine.start(DESTINATION, &CancellationToken::new()).await.unwrap();

    assert_eq!(handle.step_index, 0);
    assert_eq!(h.sms.call_count(), 3);
    assert_eq!(h.voice.call_count(), 0);
}

#[tokio::test]
async fn test_start_escalates_immediately_on_permanent_failure() {
    let h = Harness::new(sms_whatsapp_voice(), fast_config());
    h.sms.push_outcome(Err(DeliveryError::Permanent("landline".into())));

    let handle = h.engine.start(DESTINATION, &CancellationToken::new()).await.unwrap();

    assert_eq!(handle.step_index, 1);
    assert_eq!(handle.channel, Some(Channel::WhatsApp));
    assert_eq!(h.sms.call_count(), 1);
    assert_eq!(h.whatsapp.sent().len(), 1);

    let session = h.session(handle.session_id).await;
    assert_eq!(session.step_deadline, session.created_at + ChronoDuration::seconds(30));
}

#[tokio::test(start_paused = true)]
async fn test_start_escalates_after_retries_are_used_up() {
    let h = Harness::new(sms_voice(), fast_config());
    h.sms.fail_always(DeliveryError::Transient("gateway down".into()));

    let handle = h.engine.start(DESTINATION, &CancellationToken::new()).await.unwrap();

    assert_eq!(h.sms.call_count(), 3);
    assert_eq!(handle.channel, Some(Channel::Voice));
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_is_bounded_by_send_timeout() {
    let h = Harness::new(sms_voice(), fast_config());
    h.sms.set_latency(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    let handle = h.engine.start(DESTINATION, &CancellationToken::new()).await.unwrap();

    assert_eq!(handle.channel, Some(Channel::Voice));
    assert_eq!(h.sms.call_count(), 3);
    assert!(h.sms.sent().is_empty());
    // Three 1s timeouts plus 10ms and 20ms of backoff.
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_all_channels_failed_persists_nothing() {
    let h = Harness::new(sms_voice(), fast_config());
    h.sms.fail_always(DeliveryError::Transient("down".into()));
    h.voice.fail_always(DeliveryError::Permanent("unsupported".into()));

    let err = h.engine.start(DESTINATION, &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, DomainError::AllChannelsFailed));
    assert!(h.sessions.is_empty().await);
    assert_eq!(h.voice.call_count(), 1);
}

#[tokio::test]
async fn test_escalation_follows_strategy_order() {
    let h = Harness::new(sms_voice(), fast_config());
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(31);
    let handle = h.engine.advance(id, &cancel).await.unwrap();
    assert_eq!(handle.status, SessionStatus::Pending);
    assert_eq!(handle.step_index, 1);
    assert_eq!(handle.channel, Some(Channel::Voice));
    assert_eq!(h.voice.sent().len(), 1);

    h.clock.advance_secs(30);
    let handle = h.engine.advance(id, &cancel).await.unwrap();
    assert_eq!(handle.status, SessionStatus::Exhausted);
    assert_eq!(handle.step_index, 2);
    assert_eq!(handle.channel, None);
}

#[tokio::test]
async fn test_advance_before_step_deadline_is_noop() {
    let h = Harness::new(sms_voice(), fast_config());
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;
    let before = h.session(id).await;

    h.clock.advance_secs(29);
    let handle = h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(handle.step_index, 0);
    assert_eq!(h.session(id).await, before);
    assert_eq!(h.voice.call_count(), 0);
}

#[tokio::test]
async fn test_duplicate_triggers_escalate_once() {
    let h = Harness::new(sms_whatsapp_voice(), fast_config());
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(30);
    let first = h.engine.advance(id, &cancel).await.unwrap();
    let second = h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.step_index, 1);
    assert_eq!(h.whatsapp.call_count(), 1);
    assert_eq!(h.voice.call_count(), 0);
}

#[tokio::test]
async fn test_advance_is_idempotent_on_terminal_sessions() {
    let h = Harness::new(sms_voice(), fast_config());
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(31);
    h.engine.advance(id, &cancel).await.unwrap();
    h.clock.advance_secs(31);
    let exhausted = h.engine.advance(id, &cancel).await.unwrap();
    let stored = h.session(id).await;

    for _ in 0..3 {
        h.clock.advance_secs(100);
        let again = h.engine.advance(id, &cancel).await.unwrap();
        assert_eq!(again.status, SessionStatus::Exhausted);
        assert_eq!(again.step_index, exhausted.step_index);
    }
    assert_eq!(h.session(id).await, stored);
}

#[tokio::test]
async fn test_session_deadline_wins_over_step_advance() {
    let config = EscalationConfig {
        session_ttl: ChronoDuration::seconds(45),
        ..fast_config()
    };
    let h = Harness::new(sms_voice(), config);
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    // Step deadline (30s) and session deadline (45s) have both passed.
    h.clock.advance_secs(50);
    let handle = h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(handle.status, SessionStatus::Expired);
    assert_eq!(handle.step_index, 0);
    assert_eq!(h.voice.call_count(), 0);
}

#[tokio::test]
async fn test_failed_delivery_during_advance_keeps_escalating() {
    let h = Harness::new(sms_whatsapp_voice(), fast_config());
    h.whatsapp.fail_always(DeliveryError::Permanent("not on whatsapp".into()));
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(30);
    let handle = h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(handle.step_index, 2);
    assert_eq!(handle.channel, Some(Channel::Voice));
    assert_eq!(h.whatsapp.call_count(), 1);
    assert_eq!(h.voice.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_on_last_step_exhausts() {
    let h = Harness::new(sms_voice(), fast_config());
    h.voice.fail_always(DeliveryError::Permanent("no voice".into()));
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(30);
    let handle = h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(handle.status, SessionStatus::Exhausted);
    assert_eq!(handle.step_index, 2);
}

#[tokio::test]
async fn test_reuse_policy_keeps_code() {
    let h = Harness::new(sms_voice(), fast_config());
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(30);
    h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(h.sms.sent()[0].code, h.voice.sent()[0].code);
    assert_eq!(h.session(id).await.current_code, h.sms.sent()[0].code);
}

#[tokio::test]
async fn test_rotate_policy_mints_new_code() {
    let config = EscalationConfig {
        code_policy: CodePolicy::Rotate,
        ..fast_config()
    };
    let h = Harness::new(sms_voice(), config);
    let engine = Arc::try_unwrap(h.engine)
        .ok()
        .expect("sole owner")
        .with_generator(CodeGenerator::numeric(16).unwrap());
    let cancel = CancellationToken::new();
    let id = engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(30);
    engine.advance(id, &cancel).await.unwrap();

    let first = h.sms.sent()[0].code.clone();
    let second = h.voice.sent()[0].code.clone();
    assert_eq!(first.len(), 16);
    assert_ne!(first, second);
    assert_eq!(h.sessions.get(&id).await.unwrap().unwrap().current_code, second);
}

#[tokio::test]
async fn test_advance_unknown_session() {
    let h = Harness::new(sms_voice(), fast_config());
    let err = h
        .engine
        .advance(Uuid::new_v4(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SessionNotFound { .. }));
}

#[tokio::test]
async fn test_cancelled_start_writes_nothing() {
    let h = Harness::new(sms_voice(), fast_config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h.engine.start(DESTINATION, &cancel).await.unwrap_err();

    assert!(matches!(err, DomainError::Cancelled));
    assert_eq!(h.sms.call_count(), 0);
    assert!(h.sessions.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_slow_delivery_aborts_promptly() {
    let config = EscalationConfig {
        send_timeout: Duration::from_secs(30),
        ..fast_config()
    };
    let h = Harness::new(sms_voice(), config);
    h.sms.set_latency(Duration::from_secs(20));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = h.engine.start(DESTINATION, &cancel).await.unwrap_err();

    assert!(matches!(err, DomainError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(h.sessions.is_empty().await);
}

#[tokio::test]
async fn test_cancelled_advance_leaves_session_untouched() {
    let h = Harness::new(sms_voice(), fast_config());
    let id = h
        .engine
        .start(DESTINATION, &CancellationToken::new())
        .await
        .unwrap()
        .session_id;
    let before = h.session(id).await;

    h.clock.advance_secs(31);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h.engine.advance(id, &cancel).await.unwrap_err();

    assert!(matches!(err, DomainError::Cancelled));
    assert_eq!(h.session(id).await, before);
}

#[tokio::test]
async fn test_advance_retries_after_version_conflict() {
    let scripted = Arc::new(ScriptedSessionStore::new());
    let sessions = Arc::new(scripted.inner().clone());
    let h = Harness::with_store(sms_voice(), fast_config(), scripted.clone(), sessions);
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.clock.advance_secs(31);
    scripted.inject_conflicts(1);
    let handle = h.engine.advance(id, &cancel).await.unwrap();

    assert_eq!(handle.step_index, 1);
    let stored = h.session(id).await;
    assert_eq!(stored.step_index, 1);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_store_failure_surfaces_and_keeps_previous_state() {
    let scripted = Arc::new(ScriptedSessionStore::new());
    let sessions = Arc::new(scripted.inner().clone());
    let h = Harness::with_store(sms_voice(), fast_config(), scripted.clone(), sessions);
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;
    let before = h.session(id).await;

    h.clock.advance_secs(31);
    scripted.fail_writes(true);
    let err = h.engine.advance(id, &cancel).await.unwrap_err();

    assert!(matches!(err, DomainError::Store(_)));
    assert_eq!(h.session(id).await, before);
}

#[test]
fn test_engine_requires_adapter_for_every_step() {
    let table = StrategyTable::new(sms_voice()).unwrap();
    let ports: DeliveryRegistry = HashMap::new();
    let result = EscalationEngine::new(
        table,
        ports,
        Arc::new(InMemorySessionStore::new()),
        fast_config(),
    );
    assert!(matches!(result, Err(DomainError::InvalidStrategy { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_verify_is_not_blocked_by_slow_advance() {
    let config = EscalationConfig {
        send_timeout: Duration::from_secs(30),
        ..fast_config()
    };
    let h = Harness::new(sms_voice(), config);
    let gate = VerificationGate::for_engine(&h.engine);
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;
    let code = h.sms.last_code_for(DESTINATION).unwrap();

    h.voice.set_latency(Duration::from_secs(4));
    h.voice
        .fail_always(DeliveryError::Transient("carrier busy".to_string()));
    h.clock.advance_secs(31);

    let advancing = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.advance(id, &CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.voice.call_count(), 1);

    let started = tokio::time::Instant::now();
    let result = gate.verify(id, &code, &cancel).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(result, MatchResult::Success);

    // The advance finishes its retries and leaves the verified session alone
    let handle = advancing.await.unwrap().unwrap();
    assert_eq!(handle.status, SessionStatus::Verified);
    assert_eq!(h.voice.call_count(), 3);
    let stored = h.session(id).await;
    assert_eq!(stored.status, SessionStatus::Verified);
    assert_eq!(stored.step_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_advance_delivers_once() {
    let h = Harness::new(sms_voice(), fast_config());
    let cancel = CancellationToken::new();
    let id = h.engine.start(DESTINATION, &cancel).await.unwrap().session_id;

    h.voice.set_latency(Duration::from_millis(500));
    h.clock.advance_secs(31);

    let first = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.advance(id, &CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = h.engine.advance(id, &cancel).await.unwrap();
    assert_eq!(second.step_index, 0);

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.step_index, 1);
    assert_eq!(h.voice.call_count(), 1);
}
