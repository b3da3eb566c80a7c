// src/services/mail.rs

//! Mail transport boundary and the SMTP implementation.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::EmailSettings;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub html_body: String,
}

/// Something that can deliver a rendered message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message. Any failure is a transport error.
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// SMTP delivery over a STARTTLS-upgraded connection.
pub struct SmtpMailer {
    sender: Mailbox,
    recipient: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a mailer from validated email settings.
    pub fn from_settings(settings: &EmailSettings) -> Result<Self> {
        let sender: Mailbox = settings
            .sender_email
            .parse()
            .map_err(|e| AppError::config(format!("email.sender_email is invalid: {e}")))?;
        let recipient: Mailbox = settings
            .recipient_email
            .parse()
            .map_err(|e| AppError::config(format!("email.recipient_email is invalid: {e}")))?;
        let port = settings
            .smtp_port
            .ok_or_else(|| AppError::config("email.smtp_port is not configured"))?;

        let credentials = Credentials::new(
            settings.sender_email.clone(),
            settings.sender_password.clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_server)
            .map_err(AppError::transport)?
            .port(port)
            .credentials(credentials)
            .build();

        Ok(Self {
            sender,
            recipient,
            transport,
        })
    }

    /// Build the MIME message for a report.
    fn build_message(&self, mail: &OutgoingMail) -> Result<Message> {
        Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body.clone())
            .map_err(AppError::transport)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = self.build_message(mail)?;

        log::info!("Connecting to SMTP server...");
        self.transport
            .send(message)
            .await
            .map_err(AppError::transport)?;

        log::info!("Email sent successfully to {}", self.recipient.email);
        Ok(())
    }
}
