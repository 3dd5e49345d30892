//! Outbound Email
//!
//! Provides:
//! - `Mailer` trait used by the event dispatcher
//! - `SmtpMailer` over lettre's async SMTP transport
//! - `NoOpMailer` when no SMTP host is configured

use async_trait::async_trait;
use ec_config::{EmailConfig, SmtpTls};
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Email delivery is disabled")]
    Disabled,

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;

    fn is_enabled(&self) -> bool;
}

pub struct NoOpMailer;

#[async_trait]
impl Mailer for NoOpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        debug!(subject = %message.subject, "Email disabled, not sending");
        Err(MailError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self, MailError> {
        let builder = match config.tls {
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?,
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        };

        let mut builder = builder.port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        let from: Mailbox = config.from.parse()?;

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            tls = ?config.tls,
            "SMTP mailer configured"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message, MailError> {
        let to: Mailbox = message.to.parse()?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))?;
        Ok(email)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = self.build(message)?;
        self.transport.send(email).await?;
        debug!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Welcome".to_string(),
            text: "Hello".to_string(),
            html: "<p>Hello</p>".to_string(),
        }
    }

    fn local_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            tls: SmtpTls::None,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_noop_mailer_reports_disabled() {
        let result = NoOpMailer.send(&message("a@b.com")).await;
        assert!(matches!(result, Err(MailError::Disabled)));
        assert!(!NoOpMailer.is_enabled());
    }

    #[tokio::test]
    async fn test_builds_multipart_message() {
        let mailer = SmtpMailer::from_config(&local_config()).unwrap();
        let email = mailer.build(&message("patient@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: Welcome"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_rejects_bad_recipient() {
        let mailer = SmtpMailer::from_config(&local_config()).unwrap();
        assert!(matches!(mailer.build(&message("not an address")), Err(MailError::Address(_))));
    }

    #[test]
    fn test_rejects_bad_sender() {
        let config = EmailConfig {
            from: "nobody".to_string(),
            ..local_config()
        };
        assert!(SmtpMailer::from_config(&config).is_err());
    }
}
