//! Handoff of composed mails to SMTP.
//!
//! Uses `lettre` to build MIME messages and send them through a relay.

use attachlink_shared::config::EmailConfig;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::debug;

use crate::compose::{AttachmentPart, ComposedMail, TextBody, TextKind};
use crate::recipients::MailAddress;

/// Mail transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to build the MIME message.
    #[error("failed to build mail: {0}")]
    Build(String),
    /// An address is not a valid mailbox.
    #[error("invalid mail address: {0}")]
    InvalidAddress(String),
    /// The relay rejected or could not take the mail.
    #[error("failed to send mail: {0}")]
    Send(String),
}

impl TransportError {
    /// Create a build error.
    #[must_use]
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }
}

/// Delivers composed mails.
pub trait MailTransport: Send + Sync {
    /// Send one mail.
    fn send(
        &self,
        mail: &ComposedMail,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// Build the MIME message of `mail`.
///
/// The text part comes first, followed by one part per attachment; parts
/// with a Content-ID are attached inline.
///
/// # Errors
///
/// Returns an error if an address is invalid or the message has no recipient.
pub fn build_message(mail: &ComposedMail) -> Result<Message, TransportError> {
    let mut builder = Message::builder()
        .from(mailbox(&mail.from)?)
        .subject(mail.subject.as_str());
    for address in &mail.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &mail.cc {
        builder = builder.cc(mailbox(address)?);
    }
    for address in &mail.bcc {
        builder = builder.bcc(mailbox(address)?);
    }

    let body = text_part(mail.text.as_ref());
    let message = if mail.attachments.is_empty() {
        builder.singlepart(body)
    } else {
        let mut parts = MultiPart::mixed().singlepart(body);
        for attachment in &mail.attachments {
            parts = parts.singlepart(attachment_part(attachment)?);
        }
        builder.multipart(parts)
    };

    message.map_err(|e| TransportError::build(e.to_string()))
}

fn mailbox(address: &MailAddress) -> Result<Mailbox, TransportError> {
    let email = address
        .email
        .parse()
        .map_err(|e| TransportError::InvalidAddress(format!("{}: {e}", address.email)))?;
    Ok(Mailbox::new(address.name.clone(), email))
}

fn text_part(text: Option<&TextBody>) -> SinglePart {
    match text {
        Some(TextBody {
            content,
            kind: TextKind::Html,
        }) => SinglePart::html(content.clone()),
        Some(TextBody {
            content,
            kind: TextKind::Plain,
        }) => SinglePart::plain(content.clone()),
        None => SinglePart::plain(String::new()),
    }
}

fn attachment_part(attachment: &AttachmentPart) -> Result<SinglePart, TransportError> {
    let content_type = ContentType::parse(&attachment.content_type)
        .or_else(|_| ContentType::parse("application/octet-stream"))
        .map_err(|e| TransportError::build(e.to_string()))?;
    let builder = match &attachment.content_id {
        Some(content_id) => Attachment::new_inline(content_id.clone()),
        None => Attachment::new(attachment.file_name.clone()),
    };
    Ok(builder.body(attachment.content().to_vec(), content_type))
}

/// SMTP relay transport.
#[derive(Clone)]
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Creates a transport for the configured relay.
    ///
    /// Without a username the relay is contacted in plain text, which suits
    /// local development relays.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, TransportError> {
        let inner = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| TransportError::Send(e.to_string()))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };
        Ok(Self { inner })
    }
}

impl MailTransport for SmtpTransport {
    async fn send(&self, mail: &ComposedMail) -> Result<(), TransportError> {
        let message = build_message(mail)?;
        self.inner
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        debug!(
            subject = %mail.subject,
            recipients = mail.recipients().count(),
            "mail handed to relay"
        );
        Ok(())
    }
}
