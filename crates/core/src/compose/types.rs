//! Compose domain types.

use attachlink_shared::types::{ContextId, FolderId, UserId};
use bytes::Bytes;
use serde::Serialize;

use crate::i18n::Locale;
use crate::publish::Principal;
use crate::recipients::MailAddress;

/// Account ID of a user's primary mail account.
pub const PRIMARY_ACCOUNT_ID: u32 = 0;

/// One mail attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// File name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes; zero or negative when not yet known.
    pub size: i64,
    /// Content-ID of inline parts.
    pub content_id: Option<String>,
    content: Bytes,
}

impl AttachmentPart {
    /// Create an attachment whose size is the length of `content`.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: i64::try_from(content.len()).unwrap_or(i64::MAX),
            content_id: None,
            content,
        }
    }

    /// Override the declared size.
    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    /// Set the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Raw content.
    #[must_use]
    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

/// Format of a text body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    /// `text/plain`
    Plain,
    /// `text/html`
    Html,
}

/// The text part of a mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBody {
    /// Body content.
    pub content: String,
    /// Body format.
    pub kind: TextKind,
}

impl TextBody {
    /// Plain-text body.
    #[must_use]
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: TextKind::Plain,
        }
    }

    /// HTML body.
    #[must_use]
    pub fn html(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: TextKind::Html,
        }
    }
}

/// The sending user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeSession {
    /// User ID.
    pub user: UserId,
    /// Tenant context.
    pub context: ContextId,
    /// Mail account the mail is sent through.
    pub account_id: u32,
    /// Sender address.
    pub address: MailAddress,
    /// Sender locale.
    pub locale: Locale,
    /// Root folder of the user's files.
    pub home_folder: FolderId,
}

impl ComposeSession {
    /// Identity used for storage operations.
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal {
            user: self.user,
            context: self.context,
        }
    }

    /// Whether the mail goes through the primary account.
    #[must_use]
    pub const fn is_primary_account(&self) -> bool {
        self.account_id == PRIMARY_ACCOUNT_ID
    }
}

/// Envelope of the mail being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailDraft {
    /// Sender.
    pub from: Option<MailAddress>,
    /// `To` recipients.
    pub to: Vec<MailAddress>,
    /// `Cc` recipients.
    pub cc: Vec<MailAddress>,
    /// `Bcc` recipients.
    pub bcc: Vec<MailAddress>,
    /// Subject.
    pub subject: String,
}

/// Who an outbound mail is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// The unchanged source mail, for all recipients.
    All,
    /// Internal users sharing one locale.
    Internal,
    /// Recipients outside this installation.
    External,
}

/// An outbound mail ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMail {
    /// Sender.
    pub from: MailAddress,
    /// `To` recipients.
    pub to: Vec<MailAddress>,
    /// `Cc` recipients.
    pub cc: Vec<MailAddress>,
    /// `Bcc` recipients.
    pub bcc: Vec<MailAddress>,
    /// Subject.
    pub subject: String,
    /// Text part.
    pub text: Option<TextBody>,
    /// Attachments.
    pub attachments: Vec<AttachmentPart>,
    /// Locale the boilerplate was rendered in.
    pub locale: Locale,
    /// Intended audience.
    pub audience: Audience,
}

impl ComposedMail {
    /// All recipients, To then Cc then Bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &MailAddress> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}

/// Non-fatal notes about a compose run, for logging and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComposeWarning {
    /// The quota was exceeded and attachments were replaced by links.
    AttachmentsPublished {
        /// Number of published attachments.
        count: usize,
        /// Bytes consumed by the attachments.
        consumed: u64,
        /// Total quota in bytes (zero = unlimited).
        limit: u64,
    },
}

/// Result of [`generate_composed_mails`](crate::compose::AttachmentHandler::generate_composed_mails).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOutcome {
    /// Outbound mails; never empty.
    pub mails: Vec<ComposedMail>,
    /// Soft warnings.
    pub warnings: Vec<ComposeWarning>,
}

impl ComposeOutcome {
    /// Outcome with one mail and no warnings.
    #[must_use]
    pub fn single(mail: ComposedMail) -> Self {
        Self {
            mails: vec![mail],
            warnings: Vec::new(),
        }
    }
}
