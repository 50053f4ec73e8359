//! Daily trade summary over email.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::models::{TradeLogEntry, TradeOutcome};

pub const SUMMARY_SUBJECT: &str = "Daily Trade Summary";

/// Outbound plain-text message channel.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// SMTP over implicit TLS with a fixed sender and receiver.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .sender
            .parse()
            .with_context(|| format!("invalid sender address: {}", config.sender))?;
        let to: Mailbox = config
            .receiver
            .parse()
            .with_context(|| format!("invalid receiver address: {}", config.receiver))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .context("failed to configure SMTP relay")?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

/// Render the win/loss tally, or `None` for an empty log.
pub fn summarize(entries: &[TradeLogEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let wins = entries
        .iter()
        .filter(|e| e.outcome == TradeOutcome::Win)
        .count();
    let losses = entries.len() - wins;

    Some(format!("WINS: {wins}\nLOSSES: {losses}"))
}

/// Sends summaries when email is configured, does nothing otherwise.
#[derive(Clone, Default)]
pub struct SummaryNotifier {
    inner: Option<Arc<dyn Mailer>>,
}

impl SummaryNotifier {
    pub fn new(mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self { inner: mailer }
    }

    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self> {
        let inner = match config {
            Some(cfg) => Some(Arc::new(SmtpMailer::new(cfg)?) as Arc<dyn Mailer>),
            None => None,
        };
        Ok(Self { inner })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Email the summary. Failures are logged, never returned.
    pub async fn send_summary(&self, summary: &str) {
        let Some(mailer) = &self.inner else {
            info!("Email not configured, summary not sent");
            return;
        };

        match mailer.send(SUMMARY_SUBJECT, summary).await {
            Ok(()) => info!("Daily summary emailed"),
            Err(e) => warn!(error = %e, "Failed to send daily summary"),
        }
    }
}
