// src/notify/email.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Mailer;
use crate::error::ConfigError;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP settings. Read from the environment only; never from the config file.
#[derive(Clone)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    /// Raw `EMAIL_TO`, comma separated; may be empty when the subscriber file is used.
    pub to: String,
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl EmailSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &'static str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let user = var("EMAIL_USER").ok_or(ConfigError::MissingEnv("EMAIL_USER"))?;
        let password = var("EMAIL_PASSWORD").ok_or(ConfigError::MissingEnv("EMAIL_PASSWORD"))?;
        let port = match var("SMTP_PORT") {
            Some(p) => p.parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                name: "SMTP_PORT",
                value: p.clone(),
            })?,
            None => DEFAULT_SMTP_PORT,
        };
        Ok(Self {
            host: var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port,
            from: var("EMAIL_FROM").unwrap_or_else(|| user.clone()),
            to: var("EMAIL_TO").unwrap_or_default(),
            user,
            password,
        })
    }
}

/// STARTTLS SMTP delivery through `lettre`.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let creds = Credentials::new(settings.user.clone(), settings.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .with_context(|| format!("invalid SMTP_HOST `{}`", settings.host))?
            .port(settings.port)
            .credentials(creds)
            .build();
        let from = settings
            .from
            .parse()
            .with_context(|| format!("invalid EMAIL_FROM `{}`", settings.from))?;
        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Mailer for EmailSender {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> Result<()> {
        let to: Mailbox = to.parse().with_context(|| format!("invalid recipient `{to}`"))?;
        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
