//! Twilio SMS adapter.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SmsSettings;
use crate::notification::{redact, ChannelType};

use super::{ensure_success, ChannelError, SmsChannel, SmsMessage};

pub struct TwilioSmsChannel {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    endpoint: String,
    from_number: Option<String>,
    messaging_service_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: Option<String>,
}

impl TwilioSmsChannel {
    pub fn new(
        http: reqwest::Client,
        account_sid: String,
        auth_token: String,
        settings: &SmsSettings,
    ) -> Self {
        let endpoint = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            settings.api_base.trim_end_matches('/'),
            account_sid
        );
        Self {
            http,
            account_sid,
            auth_token,
            endpoint,
            from_number: settings.from_number.clone(),
            messaging_service_sid: settings.messaging_service_sid.clone(),
        }
    }

    /// Form fields for the Messages resource.
    ///
    /// A messaging service takes precedence over a sender number unless the
    /// message names its own sender.
    pub(crate) fn form_params<'a>(&'a self, message: &'a SmsMessage) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("To", message.to.as_str()), ("Body", message.body.as_str())];

        match (&message.from, &self.messaging_service_sid, &self.from_number) {
            (Some(from), _, _) => params.push(("From", from.as_str())),
            (None, Some(service), _) => params.push(("MessagingServiceSid", service.as_str())),
            (None, None, Some(from)) => params.push(("From", from.as_str())),
            (None, None, None) => {}
        }

        params
    }
}

#[async_trait]
impl SmsChannel for TwilioSmsChannel {
    #[tracing::instrument(skip(self, message), fields(to = %redact(&message.to, 5)))]
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), ChannelError> {
        let transport = |source| ChannelError::Transport {
            channel: ChannelType::Sms,
            source,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form_params(message))
            .send()
            .await
            .map_err(transport)?;

        let response = ensure_success(ChannelType::Sms, response).await?;
        let sid = response
            .json::<TwilioMessageResponse>()
            .await
            .ok()
            .and_then(|r| r.sid);

        tracing::info!(action = "sms_sent", sid = ?sid, "SMS sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmsSettings {
        SmsSettings {
            api_base: "https://api.twilio.test".to_string(),
            from_number: Some("+15550000".to_string()),
            ..SmsSettings::default()
        }
    }

    fn channel(settings: &SmsSettings) -> TwilioSmsChannel {
        TwilioSmsChannel::new(
            reqwest::Client::new(),
            "AC123".to_string(),
            "secret".to_string(),
            settings,
        )
    }

    #[test]
    fn test_endpoint_includes_account() {
        let channel = channel(&settings());
        assert_eq!(
            channel.endpoint,
            "https://api.twilio.test/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_form_params_use_configured_number() {
        let channel = channel(&settings());
        let message = SmsMessage::new("+15550100", "code 1234");

        assert_eq!(
            channel.form_params(&message),
            vec![("To", "+15550100"), ("Body", "code 1234"), ("From", "+15550000")]
        );
    }

    #[test]
    fn test_form_params_prefer_messaging_service() {
        let mut settings = settings();
        settings.messaging_service_sid = Some("MG1".to_string());
        let channel = channel(&settings);

        let message = SmsMessage::new("+15550100", "hi");
        assert!(channel
            .form_params(&message)
            .contains(&("MessagingServiceSid", "MG1")));

        let mut message = SmsMessage::new("+15550100", "hi");
        message.from = Some("+15559999".to_string());
        assert!(channel.form_params(&message).contains(&("From", "+15559999")));
    }
}
