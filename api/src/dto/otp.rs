use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use ga_core::domain::{Channel, SendSummary};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendCodeRequest {
    /// Destination phone number in international format
    #[validate(length(min = 8, max = 20, message = "Phone number must be 8-20 characters"))]
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCodeResponse {
    pub session_id: Uuid,
    pub channel: Channel,
    /// Masked destination, e.g. `+1******4567`
    pub destination: String,
    pub expires_at: DateTime<Utc>,
}

impl From<SendSummary> for SendCodeResponse {
    fn from(summary: SendSummary) -> Self {
        Self {
            session_id: summary.session_id,
            channel: summary.channel,
            destination: summary.masked_destination,
            expires_at: summary.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 1, max = 64, message = "Session id is required"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub status: String,
    pub session_id: String,
}
