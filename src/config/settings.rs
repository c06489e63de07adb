use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub sms: SmsSettings,
    #[serde(default)]
    pub push: PushSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub templates: TemplateSettings,
    #[serde(default)]
    pub http_client: HttpClientSettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// Queue URL; when absent notifications are delivered directly
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_reply_to")]
    pub reply_to: String,
    #[serde(default = "default_email_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsSettings {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub messaging_service_sid: Option<String>,
    #[serde(default = "default_sms_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    /// PEM private key; literal `\n` sequences are accepted
    pub private_key: Option<String>,
    #[serde(default = "default_push_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    /// Admission cap for bulk requests
    #[serde(default = "default_max_bulk_size")]
    pub max_bulk_size: usize,
    #[serde(default = "default_email_subject")]
    pub default_email_subject: String,
    #[serde(default = "default_push_title")]
    pub default_push_title: String,
}

/// Values substituted into the verification and account templates
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSettings {
    /// Product name shown in subjects and message prefixes
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
    /// Front-end base URL for password reset links
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientSettings {
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

/// Rate limiting for the notification and push routes
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requests allowed per client within one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4003
}

fn default_body_limit() -> usize {
    10 * 1024 // 10kb
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_from_address() -> String {
    "Notifications <noreply@example.com>".to_string()
}

fn default_reply_to() -> String {
    "support@example.com".to_string()
}

fn default_email_api_base() -> String {
    "https://api.resend.com".to_string()
}

fn default_sms_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_push_api_base() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_max_bulk_size() -> usize {
    100
}

fn default_email_subject() -> String {
    "Notification".to_string()
}

fn default_push_title() -> String {
    "Notification".to_string()
}

fn default_brand_name() -> String {
    "Notifications".to_string()
}

fn default_app_url() -> String {
    "https://app.example.com".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_seconds() -> u64 {
    15 * 60 // 15 minutes
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "notification-dispatcher".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

/// Flat provider variables accepted alongside the sectioned ones
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("SQS_QUEUE_URL", "queue.url"),
    ("AWS_REGION", "queue.region"),
    ("RESEND_API_KEY", "email.api_key"),
    ("EMAIL_FROM", "email.from_address"),
    ("EMAIL_REPLY_TO", "email.reply_to"),
    ("TWILIO_ACCOUNT_SID", "sms.account_sid"),
    ("TWILIO_AUTH_TOKEN", "sms.auth_token"),
    ("TWILIO_PHONE_NUMBER", "sms.from_number"),
    ("TWILIO_MESSAGING_SERVICE_SID", "sms.messaging_service_sid"),
    ("FIREBASE_PROJECT_ID", "push.project_id"),
    ("FIREBASE_CLIENT_EMAIL", "push.client_email"),
    ("FIREBASE_PRIVATE_KEY", "push.private_key"),
    ("APP_URL", "templates.app_url"),
];

/// Sectioned environment variables.
///
/// Values stay strings until deserialization so phone numbers keep their
/// leading `+` and tokens keep leading zeros.
fn environment() -> Environment {
    Environment::default().separator("__")
}

/// Comma-separated origin list, blanks dropped
fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", 4003)?
            .set_default("queue.region", default_region())?
            .set_default("rate_limit.enabled", true)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER__PORT, QUEUE__URL, EMAIL__API_KEY, etc.
            .add_source(environment());

        for (var, key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*key, env::var(var).ok())?;
        }
        if let Ok(origins) = env::var("CORS_ORIGINS").or_else(|_| env::var("SERVER__CORS_ORIGINS")) {
            builder = builder.set_override("server.cors_origins", split_origins(&origins))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether notifications go through the durable queue
    pub fn queue_enabled(&self) -> bool {
        self.queue
            .url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Log the gaps that matter in production
    pub fn warn_missing(&self) {
        if !self.queue_enabled() {
            tracing::warn!("Queue URL not set - notifications are delivered synchronously");
        }
        if self.email.api_key.is_none() {
            tracing::warn!("Email api key not set - email sending disabled");
        }
        if self.sms.account_sid.is_none() {
            tracing::warn!("Twilio account SID not set - SMS sending disabled");
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            url: None,
            region: default_region(),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            from_address: default_from_address(),
            reply_to: default_reply_to(),
            api_base: default_email_api_base(),
        }
    }
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            messaging_service_sid: None,
            api_base: default_sms_api_base(),
        }
    }
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            client_email: None,
            private_key: None,
            api_base: default_push_api_base(),
            token_uri: default_token_uri(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_bulk_size: default_max_bulk_size(),
            default_email_subject: default_email_subject(),
            default_push_title: default_push_title(),
        }
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            brand_name: default_brand_name(),
            app_url: default_app_url(),
        }
    }
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
