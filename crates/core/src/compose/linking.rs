//! Handler replacing oversized attachments by published links.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::ComposeError;
use super::handler::HandlerSettings;
use super::render::{LinkRenderer, with_notice};
use super::state::HandlerState;
use super::types::{
    AttachmentPart, Audience, ComposeOutcome, ComposeSession, ComposeWarning, ComposedMail,
    MailDraft, TextBody,
};
use crate::i18n::{MessageKey, Translator};
use crate::publish::{PublishContext, PublishedLinks, Publisher};
use crate::quota::QuotaTracker;
use crate::recipients::{RecipientGroup, RecipientKind, RecipientSplitter, UserResolver};

/// Accepts every attachment and, once the quota is exceeded, publishes them
/// through `P` and sends links instead.
pub struct LinkingHandler<R: UserResolver, P: Publisher> {
    state: HandlerState,
    settings: HandlerSettings,
    session: ComposeSession,
    resolver: Arc<R>,
    translator: Arc<dyn Translator>,
    publisher: P,
}

impl<R: UserResolver, P: Publisher> LinkingHandler<R, P> {
    /// Create a handler publishing through `publisher`.
    #[must_use]
    pub fn new(
        settings: HandlerSettings,
        session: ComposeSession,
        resolver: Arc<R>,
        translator: Arc<dyn Translator>,
        publisher: P,
    ) -> Self {
        Self {
            state: HandlerState::new(QuotaTracker::from_config(&settings.quota)),
            settings,
            session,
            resolver,
            translator,
            publisher,
        }
    }

    /// Replace the text part.
    pub fn set_text_part(&mut self, text: TextBody) {
        self.state.text = Some(text);
    }

    /// Accept `part`; a quota violation only marks the request for publishing.
    pub fn add_attachment(&mut self, part: AttachmentPart) {
        let check = self.state.quota.add(part.size);
        if check.is_exceeded() {
            debug!(file = %part.file_name, ?check, "upload quota exceeded, attachments will be published");
        }
        self.state.attachments.push(part);
    }

    /// Accumulated state.
    #[must_use]
    pub const fn state(&self) -> &HandlerState {
        &self.state
    }

    /// Build the outbound mails.
    ///
    /// Within quota this is the draft itself. Otherwise the attachments are
    /// published and one mail per recipient group is rendered; a failure
    /// rolls back every publication.
    ///
    /// # Errors
    ///
    /// Returns an error if recipient resolution, publishing or rendering fails.
    pub async fn generate_composed_mails(
        mut self,
        draft: MailDraft,
    ) -> Result<ComposeOutcome, ComposeError> {
        if !self.state.quota.is_exceeded() {
            return Ok(ComposeOutcome::single(
                self.state.into_mail(draft, &self.session),
            ));
        }

        if let Err(e) = self.publisher.start_transaction().await {
            self.publisher.finish().await;
            return Err(e.into());
        }

        let result = match self.publish_and_render(&draft).await {
            Ok(mails) => match self.publisher.commit().await {
                Ok(()) => Ok(mails),
                Err(e) => Err(ComposeError::from(e)),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!(error = %e, "composing with published attachments failed, rolling back");
            self.publisher.rollback().await;
        }
        self.publisher.finish().await;

        let mails = result?;
        let warning = ComposeWarning::AttachmentsPublished {
            count: self.state.attachments.len(),
            consumed: self.state.quota.consumed(),
            limit: self.state.quota.total_limit(),
        };
        info!(
            attachments = self.state.attachments.len(),
            consumed = self.state.quota.consumed(),
            mails = mails.len(),
            "publishing feature used for exceeded upload quota"
        );
        Ok(ComposeOutcome {
            mails,
            warnings: vec![warning],
        })
    }

    async fn publish_and_render(
        &mut self,
        draft: &MailDraft,
    ) -> Result<Vec<ComposedMail>, ComposeError> {
        let groups = RecipientSplitter::new(
            self.resolver.as_ref(),
            self.session.context,
            self.session.locale.clone(),
        )
        .with_external_locale(self.settings.external_locale())
        .split(&draft.to, &draft.cc, &draft.bcc)
        .await?;

        let ctx = PublishContext {
            session: &self.session,
            subject: &draft.subject,
            expires_at: self.settings.expires_at(Utc::now()),
        };
        let published = self
            .publisher
            .publish_attachments(&ctx, &self.state.attachments)
            .await?;

        groups
            .iter()
            .map(|group| self.mail_for(group, draft, &published))
            .collect()
    }

    fn mail_for(
        &self,
        group: &RecipientGroup,
        draft: &MailDraft,
        published: &PublishedLinks,
    ) -> Result<ComposedMail, ComposeError> {
        let (text, attachments, audience) = if group.is_external
            && self.settings.publish.send_attachment_to_external_recipients
        {
            (
                self.state.text.clone(),
                self.state.attachments.clone(),
                Audience::External,
            )
        } else {
            let renderer = LinkRenderer::new(self.translator.as_ref());
            let rendered = renderer.render(
                &published.links,
                &group.locale,
                group.sole_recipient(),
                published.expires_at,
            )?;
            let audience = if group.is_external {
                Audience::External
            } else {
                Audience::Internal
            };

            if self.settings.publish.provide_links_in_attachment {
                let hint = renderer.text(MessageKey::LinksAttached, &group.locale);
                (
                    Some(with_notice(self.state.text.clone(), &hint)?),
                    vec![rendered.as_attachment(&draft.subject)?],
                    audience,
                )
            } else {
                (
                    Some(rendered.inline_into(self.state.text.clone())),
                    Vec::new(),
                    audience,
                )
            }
        };

        Ok(ComposedMail {
            from: draft
                .from
                .clone()
                .unwrap_or_else(|| self.session.address.clone()),
            to: group.addresses(RecipientKind::To).cloned().collect(),
            cc: group.addresses(RecipientKind::Cc).cloned().collect(),
            bcc: group.addresses(RecipientKind::Bcc).cloned().collect(),
            subject: draft.subject.clone(),
            text,
            attachments,
            locale: group.locale.clone(),
            audience,
        })
    }
}
