use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use teloxide::{prelude::*, types::Recipient};
use url::Url;

use super::{deliver_within, ChannelError, NotificationChannel};
use crate::{config::ChatBotConfig, domain::NotificationOutcome};

/// Telegram Bot API `sendMessage` to a single chat.
pub struct TelegramChannel {
    bot: Bot,
    recipient: Recipient,
    timeout: Duration,
}

impl TelegramChannel {
    pub fn new(cfg: &ChatBotConfig, timeout: Duration) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut bot = Bot::with_client(cfg.bot_token.trim(), client);
        if let Some(api_url) = &cfg.api_url {
            bot = bot.set_api_url(Url::parse(api_url.trim())?);
        }
        Ok(Self {
            bot,
            recipient: parse_recipient(&cfg.chat_id),
            timeout,
        })
    }

    async fn post(&self, message: &str) -> Result<(), ChannelError> {
        self.bot.send_message(self.recipient.clone(), message).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> NotificationOutcome {
        deliver_within(self.name(), self.timeout, self.post(message)).await
    }
}

fn parse_recipient(raw: &str) -> Recipient {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if raw.starts_with('@') => Recipient::ChannelUsername(raw.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{raw}")),
    }
}
