//! # notifier - Alert Delivery
//!
//! Opaque sink for `(subject, body)` pairs.
//!
//! - [`EmailNotifier`]   - ส่ง email ผ่าน SMTP relay (STARTTLS) ตาม `EMAIL_*`
//! - [`WebhookNotifier`] - POST JSON ไปยัง `NOTIFY_WEBHOOK_URL`
//! - [`LogNotifier`]     - fallback เมื่อไม่ได้ตั้งค่า endpoint: เขียนลง log แทน
//!
//! Delivery failure is reported as `StockwatchError::Notification`; the
//! ingestion runner logs it and carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, Mailboxes};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{EmailConfig, NotifierConfig};
use crate::error::{Result, StockwatchError};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Email when host/from/to are all set, then the webhook, otherwise the
/// log fallback. Fails only on an unusable email configuration.
pub fn from_config(config: &NotifierConfig, client: reqwest::Client) -> Result<Arc<dyn Notifier>> {
    if let Some(email) = &config.email {
        info!(host = %email.smtp_host, port = email.smtp_port, to = %email.to, "📧 Alerts will be sent by email");
        return Ok(Arc::new(EmailNotifier::new(email)?));
    }

    if !config.email_partial.is_empty() {
        warn!(
            set = ?config.email_partial,
            "EMAIL_SMTP_HOST, EMAIL_FROM and EMAIL_TO are all required for email alerts - email disabled"
        );
    }

    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(client, url, config.webhook_token.clone()))),
        None => {
            warn!("No alert transport configured - alerts will be written to the log only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

// ─── Email ────────────────────────────────────────────────────────────────────

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from:   Mailbox,
    to:     Mailboxes,
}

impl EmailNotifier {
    /// `EMAIL_TO` may hold several comma-separated addresses.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| StockwatchError::Notification(format!("invalid EMAIL_FROM '{}': {e}", config.from)))?;
        let to: Mailboxes = config
            .to
            .parse()
            .map_err(|e| StockwatchError::Notification(format!("invalid EMAIL_TO '{}': {e}", config.to)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| StockwatchError::Notification(format!("smtp relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .timeout(Some(SEND_TIMEOUT));

        if let (Some(user), Some(pass)) = (&config.user, &config.pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self { mailer: builder.build(), from, to })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for mailbox in self.to.iter() {
            builder = builder.to(mailbox.clone());
        }

        builder
            .body(body.to_string())
            .map_err(|e| StockwatchError::Notification(format!("cannot build email: {e}")))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.message(subject, body)?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| StockwatchError::Notification(format!("smtp send failed: {e}")))?;

        info!(subject, "📧 Alert delivered via email");
        Ok(())
    }
}

// ─── Webhook ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body:    &'a str,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url:    String,
    token:  Option<String>,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: &str, token: Option<String>) -> Self {
        Self {
            client,
            url: url.to_string(),
            token,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { subject, body })
            .timeout(SEND_TIMEOUT);

        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StockwatchError::Notification(format!("webhook unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StockwatchError::Notification(format!(
                "webhook rejected alert: HTTP {status}: {text}"
            )));
        }

        info!(subject, "📨 Alert delivered via webhook");
        Ok(())
    }
}

// ─── Log fallback ─────────────────────────────────────────────────────────────

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        warn!(subject, body, "🔔 Alert (notifier not configured, logging instead)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send("ALERT AAPL: 3.00% move", "body").await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_notification_error() {
        // discard port, nothing listens
        let notifier = WebhookNotifier::new(reqwest::Client::new(), "http://127.0.0.1:9/hook", None);
        let err = notifier.send("s", "b").await.unwrap_err();
        assert_eq!(err.kind(), "notification");
    }

    #[tokio::test]
    async fn missing_url_falls_back_to_log() {
        let notifier = from_config(&NotifierConfig::default(), reqwest::Client::new()).unwrap();
        assert!(notifier.send("s", "b").await.is_ok());
    }

    fn email_config(from: &str, to: &str) -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 9,
            from:      from.into(),
            to:        to.into(),
            user:      None,
            pass:      None,
        }
    }

    #[test]
    fn email_message_has_headers_and_all_recipients() {
        let notifier = EmailNotifier::new(&email_config("alerts@example.com", "ops@example.com, desk@example.com")).unwrap();
        let message = notifier.message("ALERT AAPL: 3.00% move", "AAPL moved 3.00% vs previous close.").unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: ALERT AAPL: 3.00% move"));
        assert!(raw.contains("From: alerts@example.com"));
        assert!(raw.contains("AAPL moved 3.00% vs previous close."));
    }

    #[test]
    fn invalid_email_address_is_a_notification_error() {
        let err = EmailNotifier::new(&email_config("not an address", "ops@example.com")).err().unwrap();
        assert_eq!(err.kind(), "notification");
        assert!(err.to_string().contains("EMAIL_FROM"));
    }

    #[tokio::test]
    async fn unreachable_smtp_relay_is_a_notification_error() {
        let notifier = EmailNotifier::new(&email_config("alerts@example.com", "ops@example.com")).unwrap();
        let err = notifier.send("s", "b").await.unwrap_err();
        assert_eq!(err.kind(), "notification");
    }

    #[tokio::test]
    async fn email_takes_precedence_over_webhook() {
        let config = NotifierConfig {
            email:       Some(email_config("bad address", "ops@example.com")),
            webhook_url: Some("http://127.0.0.1:9/hook".into()),
            ..Default::default()
        };
        // selecting email surfaces its config error instead of silently using the webhook
        assert!(from_config(&config, reqwest::Client::new()).is_err());
    }
}
