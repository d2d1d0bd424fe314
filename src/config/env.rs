use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Lower bound for the poll interval; anything faster reads as hostile traffic.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub const DEFAULT_SUCCESS_KEYWORDS: &[&str] =
    &["Login to book", "Book Now", "Select Seats", "Buy Tickets"];
pub const DEFAULT_WAIT_KEYWORDS: &[&str] =
    &["Coming Soon", "Notify Me", "Interested", "Not Available"];
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 500;
pub const CALLMEBOT_API_URL: &str = "https://api.callmebot.com/whatsapp.php";

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub run_mode: RunMode,
    pub cron_specs: Vec<String>,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Watch,
    Once,
    Cron,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub target_url: String,
    pub event_name: String,
    pub poll_interval: Duration,
    pub channel: ChannelConfig,
    pub classifier: ClassifierConfig,
    pub fetch: FetchConfig,
    pub notify_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub success_keywords: Vec<String>,
    pub wait_keywords: Vec<String>,
    pub ignore_case: bool,
    pub min_content_length: usize,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub impersonate_browser: bool,
}

#[derive(Debug, Clone)]
pub enum ChannelConfig {
    Email(EmailConfig),
    ChatBot(ChatBotConfig),
    WhatsApp(WhatsAppConfig),
    NoOp,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct ChatBotConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Self-hosted Bot API server; the public one when unset.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub phone: String,
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Drops the separators people write phone numbers with: spaces, dashes,
/// dots and parentheses.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

impl ChannelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ChannelConfig::Email(cfg) => {
                require("SMTP_HOST", &cfg.smtp_host)?;
                require("SMTP_USERNAME", &cfg.username)?;
                require("SMTP_PASSWORD", &cfg.password)?;
                require("ALERT_EMAIL_TO", &cfg.recipient)?;
            }
            ChannelConfig::ChatBot(cfg) => {
                require("TELEGRAM_BOT_TOKEN", &cfg.bot_token)?;
                require("TELEGRAM_CHAT_ID", &cfg.chat_id)?;
                if let Some(api_url) = &cfg.api_url {
                    Url::parse(api_url).map_err(|err| ConfigError::Invalid {
                        key: "TELEGRAM_API_URL",
                        reason: err.to_string(),
                    })?;
                }
            }
            ChannelConfig::WhatsApp(cfg) => {
                require("WHATSAPP_PHONE", &cfg.phone)?;
                require("WHATSAPP_API_KEY", &cfg.api_key)?;
                if !PHONE_RE.is_match(&normalize_phone(&cfg.phone)) {
                    return Err(ConfigError::Invalid {
                        key: "WHATSAPP_PHONE",
                        reason: "expected digits with an optional leading +".to_string(),
                    });
                }
            }
            ChannelConfig::NoOp => {}
        }
        Ok(())
    }
}

impl MonitorConfig {
    /// Checks everything `start()` needs before any network activity happens.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let raw = self.target_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::Missing("TARGET_URL"));
        }
        let url = Url::parse(raw).map_err(|err| ConfigError::Invalid {
            key: "TARGET_URL",
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "TARGET_URL",
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(ConfigError::Invalid {
                key: "CHECK_INTERVAL_SECS",
                reason: format!(
                    "{}s is below the minimum of {}s",
                    self.poll_interval.as_secs(),
                    MIN_POLL_INTERVAL.as_secs()
                ),
            });
        }

        if self.classifier.success_keywords.is_empty() {
            return Err(ConfigError::Missing("SUCCESS_KEYWORDS"));
        }

        // A zero deadline fails every fetch or send before it starts.
        for (key, value) in [
            ("FETCH_TIMEOUT_MS", self.fetch.timeout),
            ("NOTIFY_TIMEOUT_MS", self.notify_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        self.channel.validate()?;
        Ok(url)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            success_keywords: DEFAULT_SUCCESS_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            wait_keywords: DEFAULT_WAIT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            ignore_case: false,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_redirects: 5,
            impersonate_browser: false,
        }
    }
}

fn require(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(key))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MonitorConfig {
        MonitorConfig {
            target_url: "https://tickets.example.com/event/42".to_string(),
            event_name: "Final".to_string(),
            poll_interval: Duration::from_secs(60),
            channel: ChannelConfig::NoOp,
            classifier: ClassifierConfig::default(),
            fetch: FetchConfig::default(),
            notify_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn empty_target_url_is_reported_by_name() {
        let mut cfg = base();
        cfg.target_url = "  ".to_string();
        assert_eq!(cfg.validate(), Err(ConfigError::Missing("TARGET_URL")));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let mut cfg = base();
        cfg.target_url = "ftp://tickets.example.com".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "TARGET_URL", .. })
        ));
    }

    #[test]
    fn interval_below_minimum_is_rejected() {
        let mut cfg = base();
        cfg.poll_interval = Duration::from_secs(5);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "CHECK_INTERVAL_SECS", .. })
        ));
    }

    #[test]
    fn email_channel_requires_password() {
        let mut cfg = base();
        cfg.channel = ChannelConfig::Email(EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: "me@example.com".to_string(),
            password: String::new(),
            recipient: "me@example.com".to_string(),
        });
        assert_eq!(cfg.validate(), Err(ConfigError::Missing("SMTP_PASSWORD")));
    }

    #[test]
    fn whatsapp_phone_must_be_numeric() {
        let mut cfg = base();
        cfg.channel = ChannelConfig::WhatsApp(WhatsAppConfig {
            phone: "call me".to_string(),
            api_key: "123456".to_string(),
            endpoint: CALLMEBOT_API_URL.to_string(),
        });
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "WHATSAPP_PHONE", .. })
        ));
    }

    #[test]
    fn whatsapp_phone_accepts_common_separators() {
        let mut cfg = base();
        cfg.channel = ChannelConfig::WhatsApp(WhatsAppConfig {
            phone: "+91 98765-43210".to_string(),
            api_key: "123456".to_string(),
            endpoint: CALLMEBOT_API_URL.to_string(),
        });
        assert!(cfg.validate().is_ok());
        assert_eq!(normalize_phone("(022) 555.0100"), "0225550100");
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut cfg = base();
        cfg.fetch.timeout = Duration::ZERO;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "FETCH_TIMEOUT_MS", .. })
        ));

        let mut cfg = base();
        cfg.notify_timeout = Duration::ZERO;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "NOTIFY_TIMEOUT_MS", .. })
        ));
    }

    #[test]
    fn malformed_bot_api_url_is_rejected() {
        let mut cfg = base();
        cfg.channel = ChannelConfig::ChatBot(ChatBotConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            api_url: Some("not a url".to_string()),
        });
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "TELEGRAM_API_URL", .. })
        ));
    }

    #[test]
    fn valid_noop_config_yields_parsed_url() {
        let url = base().validate().unwrap();
        assert_eq!(url.host_str(), Some("tickets.example.com"));
    }
}
