//! Publish domain types.

use attachlink_shared::types::{ContextId, FileId, FolderId, StorageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::compose::ComposeSession;
use crate::recipients::MailAddress;

/// Identity on whose behalf documents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Acting user.
    pub user: UserId,
    /// Tenant context.
    pub context: ContextId,
}

/// A published attachment as handed out to recipients.
///
/// The URL may be personalized per recipient, so it is resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAttachment {
    /// Name shown for the link.
    pub display_name: String,
    url: Url,
    recipient_parameter: Option<String>,
}

impl LinkedAttachment {
    /// Create a link that is the same for all recipients.
    #[must_use]
    pub fn new(display_name: impl Into<String>, url: Url) -> Self {
        Self {
            display_name: display_name.into(),
            url,
            recipient_parameter: None,
        }
    }

    /// Personalize the link with the recipient's address in query parameter `name`.
    #[must_use]
    pub fn with_recipient_parameter(mut self, name: Option<String>) -> Self {
        self.recipient_parameter = name;
        self
    }

    /// Resolve the link for `recipient`.
    ///
    /// Without a recipient, or without a configured parameter, the neutral link is returned.
    #[must_use]
    pub fn url_for(&self, recipient: Option<&MailAddress>) -> String {
        match (&self.recipient_parameter, recipient) {
            (Some(param), Some(recipient)) => {
                let mut url = self.url.clone();
                url.query_pairs_mut().append_pair(param, &recipient.email);
                url.into()
            }
            _ => self.url.to_string(),
        }
    }
}

/// Compensation record of one stored attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    /// Identifier assigned by the store.
    pub storage_id: StorageId,
    /// Download locator, if one was obtained.
    pub locator: Option<String>,
    /// Owner of the stored document.
    pub principal: Principal,
}

/// Result of publishing a batch of attachments.
#[derive(Debug, Clone, Default)]
pub struct PublishedLinks {
    /// Links to render, in attachment order (or one folder link).
    pub links: Vec<LinkedAttachment>,
    /// When the links stop working, if they expire.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Inputs of one publish step.
#[derive(Debug, Clone)]
pub struct PublishContext<'a> {
    /// Sending user's session.
    pub session: &'a ComposeSession,
    /// Subject of the mail being composed.
    pub subject: &'a str,
    /// Expiry of published documents.
    pub expires_at: Option<DateTime<Utc>>,
}

/// How an attachment store keeps a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Keep until deleted.
    Simple,
    /// Keep until the given instant.
    Expiring(DateTime<Utc>),
}

/// Descriptive metadata stored along with a published document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMetadata {
    /// Subject of the originating mail.
    pub subject: String,
    /// Sender address of the originating mail.
    pub sender: String,
}

/// Folder listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderInfo {
    /// Folder ID.
    pub id: FolderId,
    /// Display name.
    pub name: String,
}

/// Object a guest link points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareTarget {
    /// A whole folder.
    Folder(FolderId),
    /// A single file inside a shared folder.
    File {
        /// Containing folder.
        folder: FolderId,
        /// File ID.
        file: FileId,
    },
}

/// Options of a guest share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestOptions {
    /// Password required to open the share.
    pub password: Option<String>,
    /// Expiry of the share.
    pub expires_at: Option<DateTime<Utc>>,
}

/// An anonymous guest share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestInfo {
    /// Opaque share token.
    pub token: String,
    /// Shared object.
    pub target: ShareTarget,
    /// Expiry of the share.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether a password protects the share.
    pub password_protected: bool,
}
