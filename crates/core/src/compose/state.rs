//! Accumulated state of one compose request.

use super::types::{AttachmentPart, Audience, ComposeSession, ComposedMail, MailDraft, TextBody};
use crate::quota::QuotaTracker;

/// Attachments, body and quota accumulated before finalization.
#[derive(Debug, Clone)]
pub struct HandlerState {
    /// Quota bookkeeping.
    pub quota: QuotaTracker,
    /// Accepted attachments, in insertion order.
    pub attachments: Vec<AttachmentPart>,
    /// Text part; the last write wins.
    pub text: Option<TextBody>,
}

impl HandlerState {
    /// Empty state tracking `quota`.
    #[must_use]
    pub fn new(quota: QuotaTracker) -> Self {
        Self {
            quota,
            attachments: Vec::new(),
            text: None,
        }
    }

    /// The source mail with body and attachments attached verbatim.
    #[must_use]
    pub fn into_mail(self, draft: MailDraft, session: &ComposeSession) -> ComposedMail {
        ComposedMail {
            from: draft.from.unwrap_or_else(|| session.address.clone()),
            to: draft.to,
            cc: draft.cc,
            bcc: draft.bcc,
            subject: draft.subject,
            text: self.text,
            attachments: self.attachments,
            locale: session.locale.clone(),
            audience: Audience::All,
        }
    }
}
