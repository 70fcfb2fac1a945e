//! Redis-backed session store
//!
//! Each session lives in a hash under `{prefix}:session:{id}` with two
//! fields: `version` and `data` (the JSON-encoded session). Writes go
//! through a Lua script that checks the stored version and replaces both
//! fields atomically, so concurrent API instances cannot lose updates.
//!
//! The key expires once the session deadline has passed plus a grace
//! period, which keeps terminal sessions readable for late verify calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use redis::Script;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use ga_core::domain::VerificationSession;
use ga_core::errors::StoreError;
use ga_core::repositories::SessionStore;
use ga_core::services::{Clock, SystemClock};

use super::RedisClient;
use crate::InfrastructureError;

const DATA_FIELD: &str = "data";

// KEYS[1] session key
// ARGV[1] expected version ("" to create), ARGV[2] new version,
// ARGV[3] payload, ARGV[4] ttl in seconds
static SAVE_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
local current = redis.call('HGET', KEYS[1], 'version')
if ARGV[1] == '' then
  if current then return 0 end
elseif current ~= ARGV[1] then
  return 0
end
redis.call('HSET', KEYS[1], 'version', ARGV[2], 'data', ARGV[3])
redis.call('EXPIRE', KEYS[1], ARGV[4])
return 1
"#,
    )
});

/// `SessionStore` implementation on Redis
#[derive(Clone)]
pub struct RedisSessionStore {
    client: RedisClient,
    clock: Arc<dyn Clock>,
}

impl RedisSessionStore {
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a custom clock for TTL computation
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn key_for(&self, id: &Uuid) -> String {
        session_key(&self.client.config().key_prefix, id)
    }
}

/// Key holding a session hash
pub fn session_key(prefix: &str, id: &Uuid) -> String {
    if prefix.is_empty() {
        format!("session:{}", id)
    } else {
        format!("{}:session:{}", prefix, id)
    }
}

/// Seconds the session key should live
///
/// Time left until the absolute deadline plus `grace_secs`, and never less
/// than one second so an already-late write still lands.
pub fn session_ttl_secs(session: &VerificationSession, now: DateTime<Utc>, grace_secs: u64) -> u64 {
    let remaining = (session.session_deadline - now).num_seconds().max(0) as u64;
    remaining.saturating_add(grace_secs).max(1)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, id: &Uuid) -> Result<Option<VerificationSession>, StoreError> {
        let key = self.key_for(id);
        let raw = self.client.hget(&key, DATA_FIELD).await?;

        match raw {
            Some(json) => {
                let session = serde_json::from_str::<VerificationSession>(&json)
                    .map_err(InfrastructureError::from)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session: &VerificationSession,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        let key = self.key_for(&session.id);
        let payload = serde_json::to_string(session).map_err(InfrastructureError::from)?;
        let ttl = session_ttl_secs(session, self.clock.now(), self.client.config().grace_ttl);

        let args = vec![
            expected_version.map(|v| v.to_string()).unwrap_or_default(),
            session.version.to_string(),
            payload,
            ttl.to_string(),
        ];

        let applied: i64 = self
            .client
            .run_script(&SAVE_SCRIPT, &[key.as_str()], &args)
            .await?;

        if applied == 1 {
            debug!(
                session_id = %session.id,
                version = session.version,
                ttl_secs = ttl,
                "Session persisted"
            );
            Ok(())
        } else {
            warn!(
                session_id = %session.id,
                expected_version = ?expected_version,
                "Session write rejected by version check"
            );
            Err(StoreError::Conflict {
                id: session.id.to_string(),
            })
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        match self.client.health_check().await? {
            true => Ok(()),
            false => Err(StoreError::Unavailable(
                "unexpected PING response".to_string(),
            )),
        }
    }
}
