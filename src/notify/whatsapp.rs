use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{deliver_within, ChannelError, NotificationChannel};
use crate::{
    config::{env::normalize_phone, WhatsAppConfig},
    domain::NotificationOutcome,
};

/// CallMeBot-style gateway: one GET carrying phone, text and api key.
pub struct WhatsAppChannel {
    client: Client,
    endpoint: String,
    phone: String,
    api_key: String,
    timeout: Duration,
}

impl WhatsAppChannel {
    pub fn new(cfg: &WhatsAppConfig, timeout: Duration) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            phone: normalize_phone(cfg.phone.trim()),
            api_key: cfg.api_key.trim().to_string(),
            timeout,
        })
    }

    async fn call(&self, message: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("phone", self.phone.as_str()),
                ("text", message),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                provider: "whatsapp",
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, message: &str) -> NotificationOutcome {
        deliver_within(self.name(), self.timeout, self.call(message)).await
    }
}
