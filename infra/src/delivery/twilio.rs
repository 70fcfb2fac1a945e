//! Twilio delivery adapter
//!
//! One adapter covers all three channels:
//!
//! - SMS through the Messages API
//! - WhatsApp through the Messages API, both addresses prefixed `whatsapp:`
//! - Voice through the Calls API with inline TwiML reading the code aloud
//!
//! Destinations are validated as E.164 before any request is made. Provider
//! responses are classified for the engine: throttling, 5xx and network
//! failures are transient, every other client error is permanent.

use async_trait::async_trait;
use phonenumber::{Mode, PhoneNumber};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use ga_core::domain::Channel;
use ga_core::errors::DeliveryError;
use ga_core::services::{DeliveryPort, OtpMessage};
use ga_shared::config::TwilioConfig;
use ga_shared::utils::phone::mask_phone_number;

use crate::InfrastructureError;

/// Resource returned by Twilio on a successful create
#[derive(Debug, Deserialize)]
struct TwilioResource {
    sid: String,
}

/// Error body returned by Twilio on a failed request
#[derive(Debug, Default, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Prepared API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioRequest {
    pub url: String,
    pub form: Vec<(&'static str, String)>,
}

/// Twilio implementation of `DeliveryPort`
#[derive(Clone)]
pub struct TwilioDeliveryPort {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioDeliveryPort {
    /// Build the adapter; fails when credentials are missing
    pub fn new(config: TwilioConfig, request_timeout: Duration) -> Result<Self, InfrastructureError> {
        if !config.is_configured() {
            return Err(InfrastructureError::Config(
                "Twilio account_sid, auth_token and an E.164 from_number are required".to_string(),
            ));
        }

        let http = reqwest::Client::builder().timeout(request_timeout).build()?;

        info!(
            from = %mask_phone_number(&config.from_number),
            "Twilio delivery adapter initialized"
        );

        Ok(Self { http, config })
    }

    /// Normalize a destination to E.164, rejecting anything unparseable
    pub fn validate_destination(phone: &str) -> Result<String, DeliveryError> {
        if !phone.starts_with('+') {
            return Err(DeliveryError::Permanent(
                "destination must be in E.164 format".to_string(),
            ));
        }

        let parsed = phone.parse::<PhoneNumber>().map_err(|e| {
            debug!("Invalid phone number format: {}", e);
            DeliveryError::Permanent("destination is not a valid phone number".to_string())
        })?;

        if !phonenumber::is_valid(&parsed) {
            return Err(DeliveryError::Permanent(
                "destination is not a valid phone number".to_string(),
            ));
        }

        Ok(parsed.format().mode(Mode::E164).to_string())
    }

    /// Endpoint and form body for one delivery
    pub fn build_request(&self, to: &str, channel: Channel, message: &OtpMessage) -> TwilioRequest {
        let account = format!(
            "{}/Accounts/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        );

        match channel {
            Channel::Sms => TwilioRequest {
                url: format!("{}/Messages.json", account),
                form: vec![
                    ("To", to.to_string()),
                    ("From", self.config.from_number.clone()),
                    ("Body", message.text()),
                ],
            },
            Channel::WhatsApp => TwilioRequest {
                url: format!("{}/Messages.json", account),
                form: vec![
                    ("To", format!("whatsapp:{}", to)),
                    ("From", format!("whatsapp:{}", self.config.whatsapp_sender())),
                    ("Body", message.text()),
                ],
            },
            Channel::Voice => TwilioRequest {
                url: format!("{}/Calls.json", account),
                form: vec![
                    ("To", to.to_string()),
                    ("From", self.config.from_number.clone()),
                    ("Twiml", voice_twiml(message)),
                ],
            },
        }
    }
}

/// TwiML for a call that reads the code twice
pub(crate) fn voice_twiml(message: &OtpMessage) -> String {
    let spoken = xml_escape(&message.spoken());
    format!(
        "<Response><Say>{0}</Say><Pause length=\"1\"/><Say>{0}</Say></Response>",
        spoken
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Map a non-success HTTP status to a delivery error
pub(crate) fn classify_status(status: StatusCode, body: &str) -> DeliveryError {
    let detail = serde_json::from_str::<TwilioErrorBody>(body).unwrap_or_default();
    let text = format!(
        "twilio responded {} (code {}): {}",
        status.as_u16(),
        detail.code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
        detail.message.unwrap_or_else(|| "no message".to_string())
    );

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        DeliveryError::Transient(text)
    } else {
        DeliveryError::Permanent(text)
    }
}

/// Map a transport failure to a delivery error
pub(crate) fn classify_transport(err: &reqwest::Error) -> DeliveryError {
    if err.is_builder() {
        DeliveryError::Permanent(format!("invalid request: {}", err))
    } else {
        DeliveryError::Transient(format!("network failure: {}", err))
    }
}

#[async_trait]
impl DeliveryPort for TwilioDeliveryPort {
    async fn send(
        &self,
        destination: &str,
        channel: Channel,
        message: &OtpMessage,
    ) -> Result<String, DeliveryError> {
        let to = Self::validate_destination(destination)?;
        let masked = mask_phone_number(&to);
        let request = self.build_request(&to, channel, message);

        debug!(channel = %channel, destination = %masked, "Sending through Twilio");

        let response = self
            .http
            .post(&request.url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&request.form)
            .send()
            .await
            .map_err(|e| {
                warn!(channel = %channel, destination = %masked, "Twilio request failed: {}", e);
                classify_transport(&e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(&e))?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            error!(channel = %channel, destination = %masked, "{}", err);
            return Err(err);
        }

        match serde_json::from_str::<TwilioResource>(&body) {
            Ok(resource) => {
                info!(
                    target: "delivery",
                    provider = "twilio",
                    channel = %channel,
                    destination = %masked,
                    sid = %resource.sid,
                    "OTP delivered"
                );
                Ok(resource.sid)
            }
            Err(e) => {
                // Accepted upstream; resending would duplicate the message
                warn!(channel = %channel, "Twilio accepted the request but the body was unreadable: {}", e);
                Ok(format!("twilio-{}", status.as_u16()))
            }
        }
    }

    fn provider_name(&self) -> &str {
        "twilio"
    }
}
