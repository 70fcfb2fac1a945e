//! Verification session entity
//!
//! A session is the aggregate root of one OTP lifecycle. Status transitions
//! only ever leave `Pending`; the mutators below are no-ops on a terminal
//! session so callers cannot accidentally revive one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a verification session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Verified,
    Expired,
    Exhausted,
}

impl SessionStatus {
    /// Terminal statuses never transition again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Verified => "verified",
            SessionStatus::Expired => "expired",
            SessionStatus::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one OTP lifecycle, persisted by a `SessionStore`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Unique identifier, assigned at creation
    pub id: Uuid,
    /// Address the code is delivered to
    pub destination: String,
    /// Active code value
    pub current_code: String,
    /// Position in the strategy table; `len` once escalation is exhausted
    pub step_index: usize,
    pub status: SessionStatus,
    /// Verification attempts made so far
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    /// When the current step times out and escalation is due
    pub step_deadline: DateTime<Utc>,
    /// Absolute expiry across all steps
    pub session_deadline: DateTime<Utc>,
    /// Incremented on every persisted change, used for check-and-set
    pub version: u64,
}

impl VerificationSession {
    /// Create a pending session that has just been delivered on `step_index`
    pub fn new(
        destination: impl Into<String>,
        code: impl Into<String>,
        step_index: usize,
        created_at: DateTime<Utc>,
        step_deadline: DateTime<Utc>,
        session_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination: destination.into(),
            current_code: code.into(),
            step_index,
            status: SessionStatus::Pending,
            attempt_count: 0,
            created_at,
            step_deadline,
            session_deadline,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Absolute deadline reached (inclusive)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.session_deadline
    }

    /// Current step has timed out (inclusive)
    pub fn is_step_due_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.step_deadline
    }

    /// Earliest instant at which the session needs attention from the scheduler
    pub fn next_deadline(&self) -> DateTime<Utc> {
        self.step_deadline.min(self.session_deadline)
    }

    /// Move to a later step after a successful delivery there
    pub fn escalate_to(&mut self, step_index: usize, code: String, step_deadline: DateTime<Utc>) {
        if self.is_terminal() || step_index <= self.step_index {
            return;
        }
        self.step_index = step_index;
        self.current_code = code;
        self.step_deadline = step_deadline;
    }

    /// No step left to escalate to; `past_last` is the strategy length
    pub fn exhaust_steps(&mut self, past_last: usize) {
        if self.is_terminal() {
            return;
        }
        self.step_index = self.step_index.max(past_last);
        self.status = SessionStatus::Exhausted;
    }

    /// Attempt budget used up
    pub fn exhaust_attempts(&mut self) {
        self.finish(SessionStatus::Exhausted);
    }

    pub fn expire(&mut self) {
        self.finish(SessionStatus::Expired);
    }

    pub fn mark_verified(&mut self) {
        self.finish(SessionStatus::Verified);
    }

    /// Count one verification attempt; returns the new count
    pub fn record_attempt(&mut self) -> u32 {
        if !self.is_terminal() {
            self.attempt_count = self.attempt_count.saturating_add(1);
        }
        self.attempt_count
    }

    fn finish(&mut self, status: SessionStatus) {
        if !self.is_terminal() {
            self.status = status;
        }
    }
}

// The code never shows up in debug output or logs.
impl fmt::Debug for VerificationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationSession")
            .field("id", &self.id)
            .field("destination", &ga_shared::phone::mask_phone_number(&self.destination))
            .field("current_code", &"<redacted>")
            .field("step_index", &self.step_index)
            .field("status", &self.status)
            .field("attempt_count", &self.attempt_count)
            .field("created_at", &self.created_at)
            .field("step_deadline", &self.step_deadline)
            .field("session_deadline", &self.session_deadline)
            .field("version", &self.version)
            .finish()
    }
}
