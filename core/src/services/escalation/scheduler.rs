//! Timer-driven escalation
//!
//! A single loop keeps a min-heap of `(due_at, session_id)` entries and calls
//! `EscalationEngine::advance` for every entry whose time has come. Sessions
//! that are still pending afterwards are pushed back with their next deadline.
//! Stale or duplicate entries are harmless because `advance` is idempotent.

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::value_objects::SessionHandle;
use crate::errors::{DomainError, DomainResult};
use crate::services::clock::Clock;

use super::engine::EscalationEngine;

type Entry = (DateTime<Utc>, Uuid);

/// Upper bound on how long the loop sleeps before re-reading the clock
const MAX_IDLE: Duration = Duration::from_secs(1);

/// Delay before retrying a session whose advance failed
const RETRY_AFTER_SECS: i64 = 5;

/// Cloneable handle used to register sessions with the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Entry>,
}

impl SchedulerHandle {
    /// Ask for `session_id` to be advanced at `due_at`; false once the loop is gone
    pub fn schedule(&self, session_id: Uuid, due_at: DateTime<Utc>) -> bool {
        self.tx.send((due_at, session_id)).is_ok()
    }

    /// Register a session returned by the engine, ignoring terminal ones
    pub fn track(&self, handle: &SessionHandle) {
        if !handle.is_terminal() && !self.schedule(handle.session_id, handle.next_deadline()) {
            tracing::warn!(
                session_id = %handle.session_id,
                "Escalation scheduler is not running, session will not escalate"
            );
        }
    }
}

type Advanced = (Uuid, DomainResult<SessionHandle>);

pub struct EscalationScheduler {
    engine: Arc<EscalationEngine>,
    clock: Arc<dyn Clock>,
    queue: BinaryHeap<Reverse<Entry>>,
    rx: mpsc::UnboundedReceiver<Entry>,
    tasks: JoinSet<Advanced>,
    in_flight: HashSet<Uuid>,
}

impl EscalationScheduler {
    pub fn new(engine: Arc<EscalationEngine>) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = engine.clock();
        let scheduler = Self {
            engine,
            clock,
            queue: BinaryHeap::new(),
            rx,
            tasks: JoinSet::new(),
            in_flight: HashSet::new(),
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Entries waiting in the heap (registrations not yet drained excluded)
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Sessions whose advance is running right now
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run until `cancel` fires
    ///
    /// Advances run as independent tasks; a slow provider on one session
    /// never holds back the deadlines of another.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(event = "scheduler_started", "Escalation scheduler started");
        let mut senders_gone = false;

        loop {
            let wait = self.time_until_next();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(joined) = self.tasks.join_next() => self.settle(joined),
                received = self.rx.recv(), if !senders_gone => match received {
                    Some(entry) => self.queue.push(Reverse(entry)),
                    None => senders_gone = true,
                },
                _ = tokio::time::sleep(wait) => {
                    self.spawn_due(&cancel);
                }
            }
        }

        self.tasks.abort_all();
        tracing::info!(
            pending = self.queue.len(),
            in_flight = self.in_flight.len(),
            event = "scheduler_stopped",
            "Escalation scheduler stopped"
        );
    }

    /// Advance every session that is due now and wait for all running
    /// advances; returns how many were started by this call
    pub async fn fire_due(&mut self, cancel: &CancellationToken) -> usize {
        let started = self.spawn_due(cancel);
        while let Some(joined) = self.tasks.join_next().await {
            self.settle(joined);
        }
        started
    }

    /// Start an advance for each due entry; sessions already in flight are
    /// skipped since their running advance re-queues them
    fn spawn_due(&mut self, cancel: &CancellationToken) -> usize {
        while let Ok(entry) = self.rx.try_recv() {
            self.queue.push(Reverse(entry));
        }

        let now = self.clock.now();
        let mut started = 0;
        while self.queue.peek().is_some_and(|Reverse((at, _))| *at <= now) {
            let Some(Reverse((_, id))) = self.queue.pop() else {
                break;
            };
            if !self.in_flight.insert(id) {
                continue;
            }

            let engine = Arc::clone(&self.engine);
            let cancel = cancel.clone();
            self.tasks
                .spawn(async move { (id, engine.advance(id, &cancel).await) });
            started += 1;
        }
        started
    }

    fn settle(&mut self, joined: Result<Advanced, JoinError>) {
        match joined {
            Ok((id, Ok(handle))) => {
                self.in_flight.remove(&id);
                if !handle.is_terminal() {
                    self.queue
                        .push(Reverse((handle.next_deadline(), handle.session_id)));
                }
            }
            Ok((id, Err(DomainError::SessionNotFound { .. }))) => {
                self.in_flight.remove(&id);
                tracing::debug!(session_id = %id, "Scheduled session no longer exists");
            }
            Ok((id, Err(DomainError::Cancelled))) => {
                self.in_flight.remove(&id);
            }
            Ok((id, Err(e))) => {
                self.in_flight.remove(&id);
                tracing::warn!(
                    session_id = %id,
                    error = %e,
                    event = "advance_failed",
                    "Escalation failed, will retry"
                );
                let retry_at = self.clock.now() + chrono::Duration::seconds(RETRY_AFTER_SECS);
                self.queue.push(Reverse((retry_at, id)));
            }
            Err(e) => {
                // The session id is lost with the task; it stays in flight and
                // is picked up again only if something re-registers it.
                tracing::error!(error = %e, "Escalation task panicked");
            }
        }
    }

    fn time_until_next(&self) -> Duration {
        match self.queue.peek() {
            Some(Reverse((due, _))) => (*due - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(MAX_IDLE),
            None => MAX_IDLE,
        }
    }
}
