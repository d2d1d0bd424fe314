use std::{env, str::FromStr, time::Duration};

use chrono_tz::Tz;

use super::env::{
    AppConfig, ChannelConfig, ChatBotConfig, ClassifierConfig, ConfigError, DirectoryConfig,
    EmailConfig, FetchConfig, LoggingConfig, MonitorConfig, RunMode, WhatsAppConfig,
    CALLMEBOT_API_URL, DEFAULT_MIN_CONTENT_LENGTH, DEFAULT_SUCCESS_KEYWORDS,
    DEFAULT_WAIT_KEYWORDS,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let channel = match get("NOTIFY_CHANNEL")
            .unwrap_or_else(|| "email".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "email" | "smtp" => {
                let username = get("SMTP_USERNAME").unwrap_or_default();
                ChannelConfig::Email(EmailConfig {
                    smtp_host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                    smtp_port: parse_or(&get, "SMTP_PORT", 587)?,
                    recipient: get("ALERT_EMAIL_TO").unwrap_or_else(|| username.clone()),
                    password: get("SMTP_PASSWORD").unwrap_or_default(),
                    username,
                })
            }
            "telegram" => ChannelConfig::ChatBot(ChatBotConfig {
                bot_token: get("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
                chat_id: get("TELEGRAM_CHAT_ID").unwrap_or_default(),
                api_url: get("TELEGRAM_API_URL"),
            }),
            "whatsapp" => ChannelConfig::WhatsApp(WhatsAppConfig {
                phone: get("WHATSAPP_PHONE").unwrap_or_default(),
                api_key: get("WHATSAPP_API_KEY").unwrap_or_default(),
                endpoint: get("WHATSAPP_API_URL").unwrap_or_else(|| CALLMEBOT_API_URL.to_string()),
            }),
            "none" | "noop" | "dry-run" => ChannelConfig::NoOp,
            other => {
                return Err(ConfigError::Invalid {
                    key: "NOTIFY_CHANNEL",
                    reason: format!("unknown channel {other:?}"),
                })
            }
        };

        let classifier = ClassifierConfig {
            success_keywords: get("SUCCESS_KEYWORDS")
                .map(|value| split_list(&value))
                .unwrap_or_else(|| owned_list(DEFAULT_SUCCESS_KEYWORDS)),
            wait_keywords: get("WAIT_KEYWORDS")
                .map(|value| split_list(&value))
                .unwrap_or_else(|| owned_list(DEFAULT_WAIT_KEYWORDS)),
            ignore_case: parse_bool(&get, "KEYWORD_IGNORE_CASE")?,
            min_content_length: parse_or(&get, "MIN_CONTENT_LENGTH", DEFAULT_MIN_CONTENT_LENGTH)?,
        };

        let fetch = FetchConfig {
            timeout: Duration::from_millis(parse_or(&get, "FETCH_TIMEOUT_MS", 20_000)?),
            max_redirects: parse_or(&get, "MAX_REDIRECTS", 5)?,
            impersonate_browser: parse_bool(&get, "BROWSER_IMPERSONATION")?,
        };

        let monitor = MonitorConfig {
            target_url: get("TARGET_URL").unwrap_or_default(),
            event_name: get("EVENT_NAME").unwrap_or_else(|| "Ticket sale".to_string()),
            poll_interval: Duration::from_secs(parse_or(&get, "CHECK_INTERVAL_SECS", 300)?),
            channel,
            classifier,
            fetch,
            notify_timeout: Duration::from_millis(parse_or(&get, "NOTIFY_TIMEOUT_MS", 10_000)?),
        };

        let run_mode = match get("RUN_MODE")
            .unwrap_or_else(|| "watch".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "watch" => RunMode::Watch,
            "once" => RunMode::Once,
            "cron" => RunMode::Cron,
            other => {
                return Err(ConfigError::Invalid {
                    key: "RUN_MODE",
                    reason: format!("unknown run mode {other:?}"),
                })
            }
        };

        let cron_specs = get("CHECK_CRONS")
            .map(|value| split_list(&value))
            .unwrap_or_else(|| vec!["0 */5 * * * *".to_string()]);

        let timezone = get("MONITOR_TIMEZONE").unwrap_or_else(|| "Asia/Kolkata".to_string());
        if timezone.parse::<Tz>().is_err() {
            return Err(ConfigError::Invalid {
                key: "MONITOR_TIMEZONE",
                reason: format!("unknown timezone {timezone:?}"),
            });
        }

        Ok(Self {
            monitor,
            run_mode,
            cron_specs,
            directories: DirectoryConfig {
                logs_dir: get("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            },
            logging: LoggingConfig {
                level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
            timezone,
        })
    }
}

fn parse_or<F, T>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => value.parse::<T>().map_err(|err| ConfigError::Invalid {
            key,
            reason: format!("{value:?}: {err}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool<F>(get: &F, key: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let cfg = load(&[("TARGET_URL", "https://tickets.example.com")]).unwrap();
        assert_eq!(cfg.run_mode, RunMode::Watch);
        assert_eq!(cfg.monitor.poll_interval, Duration::from_secs(300));
        assert_eq!(cfg.monitor.classifier.success_keywords.len(), 4);
        assert_eq!(cfg.monitor.classifier.min_content_length, 500);
        match cfg.monitor.channel {
            ChannelConfig::Email(email) => {
                assert_eq!(email.smtp_host, "smtp.gmail.com");
                assert_eq!(email.smtp_port, 587);
            }
            other => panic!("unexpected channel {other:?}"),
        }
    }

    #[test]
    fn recipient_defaults_to_sender() {
        let cfg = load(&[("SMTP_USERNAME", "me@example.com")]).unwrap();
        match cfg.monitor.channel {
            ChannelConfig::Email(email) => assert_eq!(email.recipient, "me@example.com"),
            other => panic!("unexpected channel {other:?}"),
        }
    }

    #[test]
    fn keyword_lists_are_semicolon_separated() {
        let cfg = load(&[("SUCCESS_KEYWORDS", "Book Now; Buy, now ;;")]).unwrap();
        assert_eq!(
            cfg.monitor.classifier.success_keywords,
            vec!["Book Now".to_string(), "Buy, now".to_string()]
        );
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let err = load(&[("NOTIFY_CHANNEL", "pigeon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "NOTIFY_CHANNEL", .. }));
    }

    #[test]
    fn non_numeric_interval_is_rejected() {
        let err = load(&[("CHECK_INTERVAL_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CHECK_INTERVAL_SECS", .. }));
    }

    #[test]
    fn whatsapp_uses_callmebot_endpoint_by_default() {
        let cfg = load(&[
            ("NOTIFY_CHANNEL", "WhatsApp"),
            ("WHATSAPP_PHONE", "+919876543210"),
            ("WHATSAPP_API_KEY", "123456"),
            ("RUN_MODE", "once"),
        ])
        .unwrap();
        assert_eq!(cfg.run_mode, RunMode::Once);
        match cfg.monitor.channel {
            ChannelConfig::WhatsApp(wa) => assert_eq!(wa.endpoint, CALLMEBOT_API_URL),
            other => panic!("unexpected channel {other:?}"),
        }
    }

    #[test]
    fn telegram_api_url_is_optional() {
        let cfg = load(&[("NOTIFY_CHANNEL", "telegram")]).unwrap();
        match cfg.monitor.channel {
            ChannelConfig::ChatBot(bot) => assert!(bot.api_url.is_none()),
            other => panic!("unexpected channel {other:?}"),
        }

        let cfg = load(&[
            ("NOTIFY_CHANNEL", "telegram"),
            ("TELEGRAM_API_URL", "http://127.0.0.1:8081"),
        ])
        .unwrap();
        match cfg.monitor.channel {
            ChannelConfig::ChatBot(bot) => {
                assert_eq!(bot.api_url.as_deref(), Some("http://127.0.0.1:8081"))
            }
            other => panic!("unexpected channel {other:?}"),
        }
    }

    #[test]
    fn zero_fetch_timeout_loads_but_fails_validation() {
        let cfg = load(&[
            ("TARGET_URL", "https://tickets.example.com"),
            ("NOTIFY_CHANNEL", "none"),
            ("FETCH_TIMEOUT_MS", "0"),
        ])
        .unwrap();
        assert!(matches!(
            cfg.monitor.validate(),
            Err(ConfigError::Invalid { key: "FETCH_TIMEOUT_MS", .. })
        ));
    }

    #[test]
    fn bad_timezone_is_rejected() {
        let err = load(&[("MONITOR_TIMEZONE", "Mars/Olympus")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MONITOR_TIMEZONE", .. }));
    }
}
