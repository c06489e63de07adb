//! Resend email adapter.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::EmailSettings;
use crate::notification::{redact, ChannelType};

use super::{ensure_success, ChannelError, EmailChannel, EmailMessage};

pub struct ResendEmailChannel {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    from_address: String,
    reply_to: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct ResendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: String,
    reply_to: &'a str,
}

impl ResendEmailChannel {
    pub fn new(http: reqwest::Client, api_key: String, settings: &EmailSettings) -> Self {
        Self {
            http,
            api_key,
            endpoint: format!("{}/emails", settings.api_base.trim_end_matches('/')),
            from_address: settings.from_address.clone(),
            reply_to: settings.reply_to.clone(),
        }
    }

    pub(crate) fn request_body<'a>(&'a self, message: &'a EmailMessage) -> ResendEmailRequest<'a> {
        ResendEmailRequest {
            from: &self.from_address,
            to: [&message.to],
            subject: &message.subject,
            text: &message.body,
            html: message
                .html
                .clone()
                .unwrap_or_else(|| message.body.replace('\n', "<br>")),
            reply_to: message.reply_to.as_deref().unwrap_or(&self.reply_to),
        }
    }
}

#[async_trait]
impl EmailChannel for ResendEmailChannel {
    #[tracing::instrument(skip(self, message), fields(to = %redact(&message.to, 5)))]
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(message))
            .send()
            .await
            .map_err(|source| ChannelError::Transport {
                channel: ChannelType::Email,
                source,
            })?;

        ensure_success(ChannelType::Email, response).await?;

        tracing::info!(action = "email_sent", subject = %message.subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ResendEmailChannel {
        let settings = EmailSettings {
            api_base: "https://api.resend.test/".to_string(),
            from_address: "noreply@example.com".to_string(),
            reply_to: "support@example.com".to_string(),
            ..EmailSettings::default()
        };
        ResendEmailChannel::new(reqwest::Client::new(), "re_test".to_string(), &settings)
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(channel().endpoint, "https://api.resend.test/emails");
    }

    #[test]
    fn test_request_body_defaults() {
        let channel = channel();
        let message = EmailMessage::new("user@example.com", "Hello", "line one\nline two");
        let body = serde_json::to_value(channel.request_body(&message)).unwrap();

        assert_eq!(body["from"], "noreply@example.com");
        assert_eq!(body["to"], serde_json::json!(["user@example.com"]));
        assert_eq!(body["text"], "line one\nline two");
        assert_eq!(body["html"], "line one<br>line two");
        assert_eq!(body["reply_to"], "support@example.com");
    }

    #[test]
    fn test_request_body_overrides() {
        let channel = channel();
        let mut message = EmailMessage::new("user@example.com", "Hello", "plain");
        message.html = Some("<p>rich</p>".to_string());
        message.reply_to = Some("team@example.com".to_string());

        let body = serde_json::to_value(channel.request_body(&message)).unwrap();
        assert_eq!(body["html"], "<p>rich</p>");
        assert_eq!(body["reply_to"], "team@example.com");
    }
}
