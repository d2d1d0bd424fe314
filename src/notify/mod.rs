pub mod email;
pub mod telegram;
pub mod whatsapp;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{error::Elapsed, timeout};

use crate::{
    config::{ChannelConfig, ConfigError, MonitorConfig},
    domain::NotificationOutcome,
};

pub use email::EmailChannel;
pub use telegram::TelegramChannel;
pub use whatsapp::WhatsAppChannel;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp submission failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid api url: {0}")]
    ApiUrl(#[from] url::ParseError),
    #[error("{provider} returned {status}: {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },
}

/// One outbound alert transport. Implementations hold only the credentials
/// they were built with and never surface errors past `send`.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str) -> NotificationOutcome;
}

/// Dry-run channel used when nothing is configured.
#[derive(Debug, Default)]
pub struct NoopChannel;

#[async_trait]
impl NotificationChannel for NoopChannel {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn send(&self, message: &str) -> NotificationOutcome {
        tracing::info!(target: "notify", chars = message.len(), "dry run: alert not sent");
        NotificationOutcome::Delivered
    }
}

pub fn build_channel(config: &MonitorConfig) -> Result<Arc<dyn NotificationChannel>, ConfigError> {
    let limit = config.notify_timeout;
    let channel: Arc<dyn NotificationChannel> = match &config.channel {
        ChannelConfig::Email(cfg) => Arc::new(EmailChannel::new(
            cfg,
            alert_subject(&config.event_name),
            limit,
        )?),
        ChannelConfig::ChatBot(cfg) => {
            let channel = TelegramChannel::new(cfg, limit).map_err(|err| {
                let key = match &err {
                    ChannelError::ApiUrl(_) => "TELEGRAM_API_URL",
                    _ => "TELEGRAM_BOT_TOKEN",
                };
                ConfigError::Invalid {
                    key,
                    reason: err.to_string(),
                }
            })?;
            Arc::new(channel)
        }
        ChannelConfig::WhatsApp(cfg) => {
            Arc::new(WhatsAppChannel::new(cfg, limit).map_err(|err| ConfigError::Invalid {
                key: "WHATSAPP_API_URL",
                reason: err.to_string(),
            })?)
        }
        ChannelConfig::NoOp => Arc::new(NoopChannel),
    };
    Ok(channel)
}

pub fn alert_subject(event_name: &str) -> String {
    format!("ALERT: Tickets Available ({event_name})")
}

pub fn compose_alert(event_name: &str, target_url: &str, detail: &str) -> String {
    format!(
        "URGENT: TICKETS MIGHT BE LIVE!\n\n\
         The monitor detected a change in status for {event_name}.\n\
         {detail}\n\n\
         Link: {target_url}\n\n\
         Go book now!"
    )
}

/// Applies the per-channel deadline and folds every failure into an outcome.
pub(crate) async fn deliver_within<F>(
    provider: &'static str,
    limit: Duration,
    attempt: F,
) -> NotificationOutcome
where
    F: std::future::Future<Output = Result<(), ChannelError>>,
{
    let result: Result<Result<(), ChannelError>, Elapsed> = timeout(limit, attempt).await;
    match result {
        Ok(Ok(())) => {
            tracing::info!(target: "notify", provider, "alert delivered");
            NotificationOutcome::Delivered
        }
        Ok(Err(err)) => {
            tracing::error!(target: "notify", provider, error = %err, "alert delivery failed");
            NotificationOutcome::Failed(err.to_string())
        }
        Err(_) => {
            tracing::error!(target: "notify", provider, ?limit, "alert delivery timed out");
            NotificationOutcome::Failed(format!("{provider} timed out after {limit:?}"))
        }
    }
}
