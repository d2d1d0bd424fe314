pub mod env;
mod loader;

pub use env::{
    AppConfig, ChannelConfig, ChatBotConfig, ClassifierConfig, ConfigError, EmailConfig,
    FetchConfig, MonitorConfig, RunMode, WhatsAppConfig,
};
pub use loader::load_config;
