//! Delivery channel adapters.
//!
//! Each channel (email, SMS, push) is an independent capability behind its own
//! trait so the dispatcher only depends on the success/failure signal:
//!
//! - `EmailChannel`: Resend HTTP API (`ResendEmailChannel`)
//! - `SmsChannel`: Twilio REST API (`TwilioSmsChannel`)
//! - `PushChannel`: Firebase Cloud Messaging HTTP v1 (`FcmPushChannel`)
//!
//! Channels without credentials are wired to `UnconfiguredChannel`, which
//! fails every send with `ChannelError::NotConfigured`.
//!
//! `MessageTemplates` renders the verification, password reset and ride
//! update messages sent through these channels.
//!
//! Use `create_channel_adapters()` to build the set from configuration.

mod email;
mod push;
mod sms;
mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Settings;
use crate::notification::ChannelType;

pub use email::ResendEmailChannel;
pub use push::{fcm_message, send_push_bulk, FcmPushChannel, PushBulkSummary, ServiceAccount};
pub use sms::TwilioSmsChannel;
pub use templates::{Language, MessageTemplates};

/// Errors reported by a delivery channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0} channel is not configured")]
    NotConfigured(ChannelType),

    #[error("{channel} provider rejected the request (status {status}): {body}")]
    Rejected {
        channel: ChannelType,
        status: u16,
        body: String,
    },

    #[error("{channel} transport error: {source}")]
    Transport {
        channel: ChannelType,
        #[source]
        source: reqwest::Error,
    },

    #[error("{channel} credentials error: {reason}")]
    Credentials { channel: ChannelType, reason: String },
}

/// Email to a single recipient
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// HTML body; derived from `body` when absent
    pub html: Option<String>,
    pub reply_to: Option<String>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            html: None,
            reply_to: None,
        }
    }
}

/// SMS to a single phone number
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
    /// Sender override; the configured number is used when absent
    pub from: Option<String>,
}

impl SmsMessage {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
            from: None,
        }
    }
}

/// Push notification to a single device token
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    pub badge: Option<u32>,
    pub sound: Option<String>,
}

impl PushMessage {
    pub fn new(token: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            title: title.into(),
            body: body.into(),
            data: None,
            badge: None,
            sound: None,
        }
    }
}

#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait SmsChannel: Send + Sync {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send_push(&self, message: &PushMessage) -> Result<(), ChannelError>;
}

/// One adapter per channel, shared by the dispatcher and the direct routes
#[derive(Clone)]
pub struct ChannelAdapters {
    pub email: Arc<dyn EmailChannel>,
    pub sms: Arc<dyn SmsChannel>,
    pub push: Arc<dyn PushChannel>,
}

impl ChannelAdapters {
    /// Adapters that reject every send; used when nothing is configured
    pub fn unconfigured() -> Self {
        Self {
            email: Arc::new(UnconfiguredChannel::new(ChannelType::Email)),
            sms: Arc::new(UnconfiguredChannel::new(ChannelType::Sms)),
            push: Arc::new(UnconfiguredChannel::new(ChannelType::Push)),
        }
    }
}

/// Stand-in for a channel whose provider credentials are missing
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredChannel {
    channel: ChannelType,
}

impl UnconfiguredChannel {
    pub fn new(channel: ChannelType) -> Self {
        Self { channel }
    }

    fn reject(&self) -> Result<(), ChannelError> {
        tracing::warn!(channel = %self.channel, "Channel not configured, skipping send");
        Err(ChannelError::NotConfigured(self.channel))
    }
}

#[async_trait]
impl EmailChannel for UnconfiguredChannel {
    async fn send_email(&self, _message: &EmailMessage) -> Result<(), ChannelError> {
        self.reject()
    }
}

#[async_trait]
impl SmsChannel for UnconfiguredChannel {
    async fn send_sms(&self, _message: &SmsMessage) -> Result<(), ChannelError> {
        self.reject()
    }
}

#[async_trait]
impl PushChannel for UnconfiguredChannel {
    async fn send_push(&self, _message: &PushMessage) -> Result<(), ChannelError> {
        self.reject()
    }
}

/// Create channel adapters based on configuration.
///
/// A channel gets its provider adapter only when all of its credentials are
/// present; otherwise it is wired to `UnconfiguredChannel`. All adapters share
/// the given HTTP client.
pub fn create_channel_adapters(settings: &Settings, http: reqwest::Client) -> ChannelAdapters {
    let mut adapters = ChannelAdapters::unconfigured();

    if let Some(api_key) = settings.email.api_key.clone() {
        tracing::info!(channel = "email", provider = "resend", "Email channel configured");
        adapters.email = Arc::new(ResendEmailChannel::new(
            http.clone(),
            api_key,
            &settings.email,
        ));
    } else {
        tracing::warn!("Email api key not set - email sending disabled");
    }

    match (&settings.sms.account_sid, &settings.sms.auth_token) {
        (Some(sid), Some(token)) => {
            tracing::info!(channel = "sms", provider = "twilio", "SMS channel configured");
            adapters.sms = Arc::new(TwilioSmsChannel::new(
                http.clone(),
                sid.clone(),
                token.clone(),
                &settings.sms,
            ));
        }
        _ => tracing::warn!("Twilio credentials not set - SMS sending disabled"),
    }

    match (
        &settings.push.project_id,
        &settings.push.client_email,
        &settings.push.private_key,
    ) {
        (Some(project_id), Some(client_email), Some(private_key)) => {
            tracing::info!(channel = "push", provider = "fcm", "Push channel configured");
            let account = ServiceAccount {
                client_email: client_email.clone(),
                private_key: private_key.replace("\\n", "\n"),
                token_uri: settings.push.token_uri.clone(),
            };
            adapters.push = Arc::new(FcmPushChannel::new(
                http,
                project_id.clone(),
                account,
                &settings.push.api_base,
            ));
        }
        _ => tracing::warn!("Firebase not configured - push notifications disabled"),
    }

    adapters
}

/// Turn a non-2xx provider response into `ChannelError::Rejected`
pub(crate) async fn ensure_success(
    channel: ChannelType,
    response: reqwest::Response,
) -> Result<reqwest::Response, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Rejected {
        channel,
        status: status.as_u16(),
        body,
    })
}
