//! Scriptable session store for failure-path testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::domain::entities::VerificationSession;
use crate::errors::StoreError;

use super::memory::InMemorySessionStore;
use super::trait_::SessionStore;

/// Wraps an `InMemorySessionStore` and injects failures on demand
#[derive(Default)]
pub struct ScriptedSessionStore {
    inner: InMemorySessionStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    conflicts_remaining: AtomicU32,
    saves: AtomicUsize,
}

impl ScriptedSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for inspecting what was actually persisted
    pub fn inner(&self) -> &InMemorySessionStore {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reject the next `count` writes with `StoreError::Conflict`
    pub fn inject_conflicts(&self, count: u32) {
        self.conflicts_remaining.store(count, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for ScriptedSessionStore {
    async fn get(&self, id: &Uuid) -> Result<Option<VerificationSession>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".to_string()));
        }
        self.inner.get(id).await
    }

    async fn save(
        &self,
        session: &VerificationSession,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".to_string()));
        }
        let conflict = self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflict {
            return Err(StoreError::Conflict {
                id: session.id.to_string(),
            });
        }
        self.inner.save(session, expected_version).await?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}
