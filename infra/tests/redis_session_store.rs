//! Integration tests for the Redis session store
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p ga_infra --test redis_session_store -- --ignored

use chrono::{Duration, Utc};
use uuid::Uuid;

use ga_core::domain::VerificationSession;
use ga_core::errors::StoreError;
use ga_core::repositories::SessionStore;
use ga_infra::cache::{RedisClient, RedisConfig, RedisSessionStore};

async fn store() -> RedisSessionStore {
    let config = RedisConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
    .with_prefix(format!("test-{}", Uuid::new_v4().simple()));

    let client = RedisClient::new(config).await.expect("Failed to connect to Redis");
    RedisSessionStore::new(client)
}

fn pending_session() -> VerificationSession {
    let now = Utc::now();
    VerificationSession::new(
        "+15551234567",
        "042817",
        0,
        now,
        now + Duration::seconds(60),
        now + Duration::seconds(300),
    )
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_health_check() {
    let store = store().await;
    assert!(store.health_check().await.is_ok());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_create_then_get() {
    let store = store().await;
    let session = pending_session();

    store.save(&session, None).await.unwrap();

    let loaded = store.get(&session.id).await.unwrap();
    assert_eq!(loaded, Some(session));
    assert_eq!(store.get(&Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_create_twice_conflicts() {
    let store = store().await;
    let session = pending_session();

    store.save(&session, None).await.unwrap();
    let err = store.save(&session, None).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_stale_version_is_rejected() {
    let store = store().await;
    let mut session = pending_session();
    store.save(&session, None).await.unwrap();

    let mut first = session.clone();
    first.record_attempt();
    first.version = 1;
    store.save(&first, Some(0)).await.unwrap();

    session.mark_verified();
    session.version = 1;
    let err = store.save(&session, Some(0)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let stored = store.get(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.attempt_count, 1);
    assert_eq!(stored.version, 1);
}
