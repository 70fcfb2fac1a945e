//! Per-session async mutual exclusion
//!
//! Operations on the same session id run one at a time inside this process;
//! operations on different ids never contend. Entries are dropped once the
//! last holder or waiter releases them, so the table only holds sessions that
//! are being worked on right now.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct SessionLocks {
    entries: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn acquire(self: &Arc<Self>, id: Uuid) -> SessionGuard {
        let mutex = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry(id).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        SessionGuard {
            locks: Arc::clone(self),
            id,
            _guard: guard,
        }
    }

    /// Take `id` only if nobody holds it right now
    pub fn try_acquire(self: &Arc<Self>, id: Uuid) -> Option<SessionGuard> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mutex = entries.entry(id).or_default().clone();
        match mutex.try_lock_owned() {
            Ok(guard) => Some(SessionGuard {
                locks: Arc::clone(self),
                id,
                _guard: guard,
            }),
            Err(_) => None,
        }
    }

    /// Ids currently locked or waited on
    pub fn active(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive access to one session; released on drop
pub struct SessionGuard {
    locks: Arc<SessionLocks>,
    id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut entries = self.locks.entries.lock().unwrap_or_else(|e| e.into_inner());
        // Two references left: the table and this guard. Nobody else can
        // clone the entry while the table lock is held.
        if entries
            .get(&self.id)
            .is_some_and(|m| Arc::strong_count(m) == 2)
        {
            entries.remove(&self.id);
        }
    }
}
