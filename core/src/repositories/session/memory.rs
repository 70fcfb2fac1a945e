//! In-process session store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::VerificationSession;
use crate::errors::StoreError;

use super::trait_::SessionStore;

/// Session store backed by a map behind an async lock
///
/// Suitable for single-instance deployments and tests. Sessions are kept
/// until `purge_finished` removes them.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, VerificationSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions whose absolute deadline passed before `cutoff`
    pub async fn purge_finished(&self, cutoff: chrono::DateTime<chrono::Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.session_deadline >= cutoff);
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &Uuid) -> Result<Option<VerificationSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).cloned())
    }

    async fn save(
        &self,
        session: &VerificationSession,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let stored_version = sessions.get(&session.id).map(|s| s.version);

        if stored_version != expected_version {
            return Err(StoreError::Conflict {
                id: session.id.to_string(),
            });
        }

        sessions.insert(session.id, session.clone());
        Ok(())
    }
}
