//! Strict handler failing on the first quota violation.

use tracing::debug;

use super::error::ComposeError;
use super::state::HandlerState;
use super::types::{AttachmentPart, ComposeOutcome, ComposeSession, MailDraft, TextBody};
use crate::quota::{QuotaCheck, QuotaTracker};

/// Rejects the attachment that violates a quota and everything after it.
#[derive(Debug, Clone)]
pub struct AbortHandler {
    state: HandlerState,
    session: ComposeSession,
    violation: Option<(QuotaCheck, String)>,
}

impl AbortHandler {
    /// Create a handler enforcing `quota`.
    #[must_use]
    pub fn new(quota: QuotaTracker, session: ComposeSession) -> Self {
        Self {
            state: HandlerState::new(quota),
            session,
            violation: None,
        }
    }

    /// Replace the text part.
    pub fn set_text_part(&mut self, text: TextBody) {
        self.state.text = Some(text);
    }

    /// Accept `part` if it stays within the quota.
    ///
    /// # Errors
    ///
    /// Returns a quota error for the violating attachment. Once a violation
    /// occurred, every later call fails with the same error and nothing is added.
    pub fn add_attachment(&mut self, part: AttachmentPart) -> Result<(), ComposeError> {
        if let Some(err) = self.stored_violation() {
            return Err(err);
        }

        let check = self.state.quota.add(part.size);
        if let Some(err) = ComposeError::from_quota(check, &part.file_name) {
            debug!(file = %part.file_name, size = part.size, "upload quota exceeded, aborting");
            self.violation = Some((check, part.file_name));
            return Err(err);
        }

        self.state.attachments.push(part);
        Ok(())
    }

    /// The draft with its attachments, unchanged.
    ///
    /// # Errors
    ///
    /// Returns the quota error if an attachment was rejected earlier.
    pub fn generate_composed_mails(self, draft: MailDraft) -> Result<ComposeOutcome, ComposeError> {
        if let Some(err) = self.stored_violation() {
            return Err(err);
        }
        Ok(ComposeOutcome::single(
            self.state.into_mail(draft, &self.session),
        ))
    }

    /// Accumulated state.
    #[must_use]
    pub const fn state(&self) -> &HandlerState {
        &self.state
    }

    fn stored_violation(&self) -> Option<ComposeError> {
        self.violation
            .as_ref()
            .and_then(|(check, file_name)| ComposeError::from_quota(*check, file_name))
    }
}
