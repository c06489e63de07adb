//! Canned account messages: verification codes, password resets and ride
//! updates.
//!
//! Texts use `{{variable}}` placeholders and come in French (the default)
//! and English. Sending goes through the regular channel traits.

use std::fmt;

use crate::config::TemplateSettings;

use super::{ChannelError, EmailChannel, EmailMessage, SmsChannel, SmsMessage};

/// Message language; anything other than `fr` falls back to English
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    French,
    English,
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("fr") {
            Language::French
        } else {
            Language::English
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

struct Localized {
    fr: &'static str,
    en: &'static str,
}

impl Localized {
    fn pick(&self, language: Language) -> &'static str {
        match language {
            Language::French => self.fr,
            Language::English => self.en,
        }
    }
}

const CODE_SUBJECT: Localized = Localized {
    fr: "{{brand}} - Code de vérification",
    en: "{{brand}} - Verification Code",
};

const CODE_EMAIL_TEXT: Localized = Localized {
    fr: "Votre code de vérification {{brand}} est: {{code}}\n\nCe code expire dans 10 minutes.",
    en: "Your {{brand}} verification code is: {{code}}\n\nThis code expires in 10 minutes.",
};

const CODE_HEADING: Localized = Localized {
    fr: "Code de vérification",
    en: "Verification Code",
};

const CODE_EXPIRY: Localized = Localized {
    fr: "Ce code expire dans 10 minutes.",
    en: "This code expires in 10 minutes.",
};

const CODE_EMAIL_HTML: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background: linear-gradient(135deg, #3B82F6, #1D4ED8); padding: 30px; text-align: center;">
    <h1 style="color: white; margin: 0;">{{brand}}</h1>
  </div>
  <div style="padding: 30px; background: #f9fafb;">
    <h2 style="color: #1f2937; text-align: center;">{{heading}}</h2>
    <div style="text-align: center; margin: 30px 0;">
      <span style="background: #3B82F6; color: white; padding: 15px 30px; font-size: 24px; font-weight: bold; letter-spacing: 5px; display: inline-block; border-radius: 8px;">{{code}}</span>
    </div>
    <p style="color: #6b7280; font-size: 14px; text-align: center;">{{expiry}}</p>
  </div>
</div>"#;

const RESET_SUBJECT: Localized = Localized {
    fr: "{{brand}} - Réinitialisation de votre mot de passe",
    en: "{{brand}} - Reset your password",
};

const RESET_TEXT: Localized = Localized {
    fr: "Bonjour {{name}},\n\nCliquez sur ce lien pour réinitialiser votre mot de passe:\n{{link}}\n\nCe lien expire dans 1 heure.",
    en: "Hello {{name}},\n\nClick this link to reset your password:\n{{link}}\n\nThis link expires in 1 hour.",
};

const CODE_SMS: Localized = Localized {
    fr: "{{brand}}: Votre code de vérification est {{code}}. Expire dans 10 minutes.",
    en: "{{brand}}: Your verification code is {{code}}. Expires in 10 minutes.",
};

const RIDE_UPDATE_SMS: &str = "{{brand}}: {{message}}";

/// Replace every `{{key}}` placeholder with its value
fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in variables {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

/// Builds and sends the canned account messages
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    brand: String,
    app_url: String,
}

impl MessageTemplates {
    pub fn new(settings: &TemplateSettings) -> Self {
        Self {
            brand: settings.brand_name.clone(),
            app_url: settings.app_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn two_factor_email(&self, to: &str, code: &str, language: Language) -> EmailMessage {
        let brand = self.brand.as_str();
        let html = render(
            CODE_EMAIL_HTML,
            &[
                ("brand", brand),
                ("heading", CODE_HEADING.pick(language)),
                ("code", code),
                ("expiry", CODE_EXPIRY.pick(language)),
            ],
        );

        EmailMessage {
            html: Some(html),
            ..EmailMessage::new(
                to,
                render(CODE_SUBJECT.pick(language), &[("brand", brand)]),
                render(
                    CODE_EMAIL_TEXT.pick(language),
                    &[("brand", brand), ("code", code)],
                ),
            )
        }
    }

    /// Reset link: `{app_url}?page=reset&token=..&lang=..`
    pub fn password_reset_link(&self, reset_token: &str, language: Language) -> String {
        format!(
            "{}?page=reset&token={}&lang={}",
            self.app_url, reset_token, language
        )
    }

    pub fn password_reset_email(
        &self,
        to: &str,
        reset_token: &str,
        first_name: &str,
        language: Language,
    ) -> EmailMessage {
        let link = self.password_reset_link(reset_token, language);

        EmailMessage::new(
            to,
            render(RESET_SUBJECT.pick(language), &[("brand", self.brand.as_str())]),
            render(
                RESET_TEXT.pick(language),
                &[("name", first_name), ("link", link.as_str())],
            ),
        )
    }

    pub fn two_factor_sms(&self, phone: &str, code: &str, language: Language) -> SmsMessage {
        SmsMessage::new(
            phone,
            render(
                CODE_SMS.pick(language),
                &[("brand", self.brand.as_str()), ("code", code)],
            ),
        )
    }

    pub fn ride_update_sms(&self, phone: &str, message: &str) -> SmsMessage {
        SmsMessage::new(
            phone,
            render(
                RIDE_UPDATE_SMS,
                &[("brand", self.brand.as_str()), ("message", message)],
            ),
        )
    }

    pub async fn send_two_factor_email(
        &self,
        channel: &dyn EmailChannel,
        to: &str,
        code: &str,
        language: Language,
    ) -> Result<(), ChannelError> {
        channel
            .send_email(&self.two_factor_email(to, code, language))
            .await
    }

    pub async fn send_password_reset_email(
        &self,
        channel: &dyn EmailChannel,
        to: &str,
        reset_token: &str,
        first_name: &str,
        language: Language,
    ) -> Result<(), ChannelError> {
        channel
            .send_email(&self.password_reset_email(to, reset_token, first_name, language))
            .await
    }

    pub async fn send_two_factor_sms(
        &self,
        channel: &dyn SmsChannel,
        phone: &str,
        code: &str,
        language: Language,
    ) -> Result<(), ChannelError> {
        channel
            .send_sms(&self.two_factor_sms(phone, code, language))
            .await
    }

    pub async fn send_ride_update_sms(
        &self,
        channel: &dyn SmsChannel,
        phone: &str,
        message: &str,
    ) -> Result<(), ChannelError> {
        channel.send_sms(&self.ride_update_sms(phone, message)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn templates() -> MessageTemplates {
        MessageTemplates::new(&TemplateSettings {
            brand_name: "VidoTaxi".to_string(),
            app_url: "https://app.example.com/".to_string(),
        })
    }

    #[derive(Default)]
    struct Outbox {
        emails: Mutex<Vec<EmailMessage>>,
        sms: Mutex<Vec<SmsMessage>>,
    }

    #[async_trait]
    impl EmailChannel for Outbox {
        async fn send_email(&self, message: &EmailMessage) -> Result<(), ChannelError> {
            self.emails.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl SmsChannel for Outbox {
        async fn send_sms(&self, message: &SmsMessage) -> Result<(), ChannelError> {
            self.sms.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn test_language_from_tag() {
        assert_eq!(Language::from_tag("fr"), Language::French);
        assert_eq!(Language::from_tag("FR"), Language::French);
        assert_eq!(Language::from_tag("en"), Language::English);
        assert_eq!(Language::from_tag("de"), Language::English);
        assert_eq!(Language::default(), Language::French);
    }

    #[test]
    fn test_render_replaces_all_occurrences() {
        assert_eq!(
            render("{{a}}-{{b}}-{{a}}", &[("a", "1"), ("b", "2")]),
            "1-2-1"
        );
        assert_eq!(render("{{missing}}", &[("a", "1")]), "{{missing}}");
    }

    #[test]
    fn test_two_factor_email_french() {
        let message = templates().two_factor_email("a@example.com", "123456", Language::French);

        assert_eq!(message.subject, "VidoTaxi - Code de vérification");
        assert!(message.body.starts_with("Votre code de vérification VidoTaxi est: 123456"));
        let html = message.html.unwrap();
        assert!(html.contains(">123456</span>"));
        assert!(html.contains("Ce code expire dans 10 minutes."));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_two_factor_email_english() {
        let message = templates().two_factor_email("a@example.com", "654321", Language::English);

        assert_eq!(message.subject, "VidoTaxi - Verification Code");
        assert!(message.body.contains("This code expires in 10 minutes."));
        assert!(message.html.unwrap().contains("Verification Code"));
    }

    #[test]
    fn test_password_reset_email() {
        let message =
            templates().password_reset_email("a@example.com", "tok-1", "Awa", Language::English);

        assert_eq!(message.subject, "VidoTaxi - Reset your password");
        assert!(message.body.starts_with("Hello Awa,"));
        assert!(message
            .body
            .contains("https://app.example.com?page=reset&token=tok-1&lang=en"));
        assert!(message.html.is_none());
    }

    #[test]
    fn test_sms_templates() {
        let templates = templates();

        let code = templates.two_factor_sms("+15550001111", "42", Language::French);
        assert_eq!(
            code.body,
            "VidoTaxi: Votre code de vérification est 42. Expire dans 10 minutes."
        );

        let update = templates.ride_update_sms("+15550001111", "Your driver is here");
        assert_eq!(update.body, "VidoTaxi: Your driver is here");
        assert_eq!(update.to, "+15550001111");
    }

    #[tokio::test]
    async fn test_send_helpers_use_channels() {
        let templates = templates();
        let outbox = Outbox::default();

        templates
            .send_two_factor_email(&outbox, "a@example.com", "1", Language::French)
            .await
            .unwrap();
        templates
            .send_password_reset_email(&outbox, "a@example.com", "t", "Awa", Language::French)
            .await
            .unwrap();
        templates
            .send_two_factor_sms(&outbox, "+1555", "1", Language::English)
            .await
            .unwrap();
        templates
            .send_ride_update_sms(&outbox, "+1555", "Arrived")
            .await
            .unwrap();

        assert_eq!(outbox.emails.lock().unwrap().len(), 2);
        assert_eq!(outbox.sms.lock().unwrap().len(), 2);
    }
}
