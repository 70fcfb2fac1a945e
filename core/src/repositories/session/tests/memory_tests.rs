use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::VerificationSession;
use crate::errors::StoreError;
use crate::repositories::session::{InMemorySessionStore, ScriptedSessionStore, SessionStore};

fn session() -> VerificationSession {
    let now = Utc::now();
    VerificationSession::new(
        "+15551234567",
        "123456",
        0,
        now,
        now + Duration::seconds(60),
        now + Duration::seconds(300),
    )
}

#[tokio::test]
async fn test_create_then_get() {
    let store = InMemorySessionStore::new();
    let session = session();

    store.save(&session, None).await.unwrap();

    let loaded = store.get(&session.id).await.unwrap().unwrap();
    assert_eq!(loaded, session);
    assert!(store.get(&Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_twice_conflicts() {
    let store = InMemorySessionStore::new();
    let session = session();

    store.save(&session, None).await.unwrap();
    let err = store.save(&session, None).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let store = InMemorySessionStore::new();
    let mut session = session();
    store.save(&session, None).await.unwrap();

    // First writer wins.
    let mut first = session.clone();
    first.attempt_count = 1;
    first.version = 1;
    store.save(&first, Some(0)).await.unwrap();

    // Second writer observed version 0 too.
    session.attempt_count = 5;
    session.version = 1;
    let err = store.save(&session, Some(0)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let stored = store.get(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.attempt_count, 1);
}

#[tokio::test]
async fn test_update_of_missing_session_conflicts() {
    let store = InMemorySessionStore::new();
    let err = store.save(&session(), Some(0)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_purge_finished() {
    let store = InMemorySessionStore::new();
    let live = session();
    let mut stale = session();
    stale.session_deadline = Utc::now() - Duration::seconds(10);

    store.save(&live, None).await.unwrap();
    store.save(&stale, None).await.unwrap();

    assert_eq!(store.purge_finished(Utc::now()).await, 1);
    assert_eq!(store.len().await, 1);
    assert!(store.get(&live.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_scripted_store_injects_failures() {
    let store = ScriptedSessionStore::new();
    let session = session();

    store.inject_conflicts(1);
    assert!(matches!(
        store.save(&session, None).await,
        Err(StoreError::Conflict { .. })
    ));
    store.save(&session, None).await.unwrap();
    assert_eq!(store.save_count(), 1);

    store.fail_reads(true);
    assert!(matches!(
        store.get(&session.id).await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(store.health_check().await.is_err());
}
