//! Handler selection and the common handler interface.

use std::sync::Arc;

use attachlink_shared::AppConfig;
use attachlink_shared::config::{PublishConfig, QuotaConfig};
use chrono::{DateTime, Duration, Utc};

use super::abort::AbortHandler;
use super::error::ComposeError;
use super::linking::LinkingHandler;
use super::state::HandlerState;
use super::types::{AttachmentPart, ComposeOutcome, ComposeSession, MailDraft, TextBody};
use crate::i18n::{Locale, Translator};
use crate::publish::Publisher;
use crate::quota::QuotaTracker;
use crate::recipients::UserResolver;

/// Settings consulted when a handler is created.
#[derive(Debug, Clone, Default)]
pub struct HandlerSettings {
    /// Upload limits.
    pub quota: QuotaConfig,
    /// Publish-on-exceeded-quota options.
    pub publish: PublishConfig,
}

impl HandlerSettings {
    /// Settings taken from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            quota: config.quota,
            publish: config.publish.clone(),
        }
    }

    /// Expiry of documents published at `now`, if they expire.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.publish.published_documents_expire {
            return None;
        }
        let ttl = i64::try_from(self.publish.ttl_millis).unwrap_or(i64::MAX);
        now.checked_add_signed(Duration::milliseconds(ttl))
    }

    /// Locale of messages to external recipients, if configured.
    #[must_use]
    pub fn external_locale(&self) -> Option<Locale> {
        self.publish
            .external_recipients_locale
            .as_deref()
            .map(Locale::parse)
    }

    /// Whether a request from `session` may publish attachments.
    #[must_use]
    pub const fn allows_publishing(&self, session: &ComposeSession) -> bool {
        self.publish.publish_on_exceeded_quota
            && (!self.publish.publish_primary_account_only || session.is_primary_account())
    }
}

/// Attachment policy of one compose request.
pub enum AttachmentHandler<R: UserResolver, P: Publisher> {
    /// Fail on the first quota violation.
    Abort(AbortHandler),
    /// Publish the attachments once the quota is exceeded.
    Linking(LinkingHandler<R, P>),
}

impl<R: UserResolver, P: Publisher> AttachmentHandler<R, P> {
    /// Pick the policy for `session`.
    ///
    /// Requests may publish only when publishing is enabled and, with
    /// primary-account scoping, the mail goes through the primary account.
    /// All other requests get the abort policy and `publisher` is dropped.
    #[must_use]
    pub fn new(
        settings: HandlerSettings,
        session: ComposeSession,
        resolver: Arc<R>,
        translator: Arc<dyn Translator>,
        publisher: P,
    ) -> Self {
        if settings.allows_publishing(&session) {
            Self::Linking(LinkingHandler::new(
                settings, session, resolver, translator, publisher,
            ))
        } else {
            Self::Abort(AbortHandler::new(
                QuotaTracker::from_config(&settings.quota),
                session,
            ))
        }
    }

    /// Whether this handler publishes on exceeded quota.
    #[must_use]
    pub const fn is_publishing(&self) -> bool {
        matches!(self, Self::Linking(_))
    }

    /// Replace the text part; the last write wins.
    pub fn set_text_part(&mut self, text: TextBody) {
        match self {
            Self::Abort(handler) => handler.set_text_part(text),
            Self::Linking(handler) => handler.set_text_part(text),
        }
    }

    /// Add one attachment.
    ///
    /// # Errors
    ///
    /// The abort policy returns a quota error for a violating attachment;
    /// the publishing policy never fails here.
    pub fn add_attachment(&mut self, part: AttachmentPart) -> Result<(), ComposeError> {
        match self {
            Self::Abort(handler) => handler.add_attachment(part),
            Self::Linking(handler) => {
                handler.add_attachment(part);
                Ok(())
            }
        }
    }

    /// Finalize the request into outbound mails.
    ///
    /// # Errors
    ///
    /// Returns an error if the quota was violated under the abort policy, or if
    /// recipient resolution, publishing or rendering fails.
    pub async fn generate_composed_mails(
        self,
        draft: MailDraft,
    ) -> Result<ComposeOutcome, ComposeError> {
        match self {
            Self::Abort(handler) => handler.generate_composed_mails(draft),
            Self::Linking(handler) => handler.generate_composed_mails(draft).await,
        }
    }

    /// Quota bookkeeping so far.
    #[must_use]
    pub const fn quota(&self) -> &QuotaTracker {
        &self.state().quota
    }

    /// Attachments accepted so far.
    #[must_use]
    pub fn attachments(&self) -> &[AttachmentPart] {
        &self.state().attachments
    }

    const fn state(&self) -> &HandlerState {
        match self {
            Self::Abort(handler) => handler.state(),
            Self::Linking(handler) => handler.state(),
        }
    }
}
