//! Periodic purge of finished sessions from the in-memory store
//!
//! Redis expires session keys on its own; the in-process map needs this
//! sweep or it grows with every code ever sent.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::repositories::InMemorySessionStore;
use crate::services::clock::{Clock, SystemClock};

/// Configuration for the session cleanup loop
#[derive(Debug, Clone)]
pub struct SessionCleanupConfig {
    /// How often to sweep the store
    pub interval: Duration,
    /// How long a session is kept after its absolute deadline
    pub retention: chrono::Duration,
}

impl Default for SessionCleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retention: chrono::Duration::seconds(600),
        }
    }
}

pub struct SessionCleanupService {
    store: Arc<InMemorySessionStore>,
    clock: Arc<dyn Clock>,
    config: SessionCleanupConfig,
}

impl SessionCleanupService {
    pub fn new(store: Arc<InMemorySessionStore>, config: SessionCleanupConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run a single cleanup cycle; returns how many sessions were dropped
    pub async fn run_cleanup(&self) -> usize {
        let cutoff = self.clock.now() - self.config.retention;
        let purged = self.store.purge_finished(cutoff).await;
        if purged > 0 {
            info!(purged = purged, event = "sessions_purged", "Purged finished sessions");
        } else {
            debug!("No finished sessions to purge");
        }
        purged
    }

    /// Sweep every `interval` until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cleanup().await;
                }
            }
        }

        info!(event = "cleanup_stopped", "Session cleanup stopped");
    }
}
