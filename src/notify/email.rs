use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{deliver_within, ChannelError, NotificationChannel};
use crate::{
    config::{ConfigError, EmailConfig},
    domain::NotificationOutcome,
};

/// SMTP submission over STARTTLS with login credentials.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(cfg: &EmailConfig, subject: String, timeout: Duration) -> Result<Self, ConfigError> {
        let from = parse_mailbox("SMTP_USERNAME", &cfg.username)?;
        let to = parse_mailbox("ALERT_EMAIL_TO", &cfg.recipient)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .map_err(|err| ConfigError::Invalid {
                key: "SMTP_HOST",
                reason: err.to_string(),
            })?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(
                cfg.username.trim().to_string(),
                cfg.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from,
            to,
            subject,
            timeout,
        })
    }

    async fn submit(&self, body: &str) -> Result<(), ChannelError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &str) -> NotificationOutcome {
        deliver_within(self.name(), self.timeout, self.submit(message)).await
    }
}

fn parse_mailbox(key: &'static str, raw: &str) -> Result<Mailbox, ConfigError> {
    raw.trim()
        .parse::<Mailbox>()
        .map_err(|err| ConfigError::Invalid {
            key,
            reason: format!("{raw:?} is not an email address: {err}"),
        })
}
