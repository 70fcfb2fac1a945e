//! Results handed back by the engine, the gate and the service facade

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Channel, SessionStatus, VerificationSession};

/// Read-only view of a session after an engine operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub step_index: usize,
    /// Channel of the current step, `None` once escalation is exhausted
    pub channel: Option<Channel>,
    pub step_deadline: DateTime<Utc>,
    pub session_deadline: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new(session: &VerificationSession, channel: Option<Channel>) -> Self {
        Self {
            session_id: session.id,
            status: session.status,
            step_index: session.step_index,
            channel,
            step_deadline: session.step_deadline,
            session_deadline: session.session_deadline,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// When the scheduler should look at this session again
    pub fn next_deadline(&self) -> DateTime<Utc> {
        self.step_deadline.min(self.session_deadline)
    }
}

/// Verification gate result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Success,
    /// Wrong code; `remaining_attempts` submissions can still succeed
    Mismatch { remaining_attempts: u32 },
    Expired,
    TooManyAttempts,
    /// Session was already terminal; nothing was mutated
    Terminal {
        status: SessionStatus,
        attempts_exhausted: bool,
    },
}

/// Outcome exposed to the transport layer by `check_verification`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum VerificationOutcome {
    Success,
    Mismatch { remaining_attempts: u32 },
    Expired,
    TooManyAttempts,
    NotFound,
}

impl From<MatchResult> for VerificationOutcome {
    fn from(result: MatchResult) -> Self {
        match result {
            MatchResult::Success => VerificationOutcome::Success,
            MatchResult::Mismatch { remaining_attempts } => {
                VerificationOutcome::Mismatch { remaining_attempts }
            }
            MatchResult::Expired => VerificationOutcome::Expired,
            MatchResult::TooManyAttempts => VerificationOutcome::TooManyAttempts,
            // A consumed session looks expired to the client.
            MatchResult::Terminal {
                attempts_exhausted: true,
                ..
            } => VerificationOutcome::TooManyAttempts,
            MatchResult::Terminal { .. } => VerificationOutcome::Expired,
        }
    }
}

/// What `send_verification` reports back; never includes the code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendSummary {
    pub session_id: Uuid,
    /// Channel the code was actually delivered on
    pub channel: Channel,
    /// Destination with all but the last digits masked
    pub masked_destination: String,
    pub expires_at: DateTime<Utc>,
}
