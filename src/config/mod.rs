mod settings;

pub use settings::{
    DispatchSettings, EmailSettings, HttpClientSettings, OtelConfig, PushSettings, QueueSettings,
    RateLimitConfig, ServerSettings, Settings, SmsSettings, TemplateSettings,
};
