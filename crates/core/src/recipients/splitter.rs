//! Partitioning of recipients into internal locale groups and external recipients.

use std::collections::{BTreeMap, HashSet};

use attachlink_shared::types::ContextId;
use tracing::debug;

use super::address::{MailAddress, Recipient, RecipientKind};
use super::directory::UserResolver;
use super::error::DirectoryError;
use crate::i18n::Locale;

/// Recipients that receive the same outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientGroup {
    /// Locale used for the translated boilerplate.
    pub locale: Locale,
    /// Members of the group, with their original header role.
    pub recipients: Vec<Recipient>,
    /// Whether the members could not be resolved to internal users.
    pub is_external: bool,
}

impl RecipientGroup {
    /// The only recipient of the group, if there is exactly one.
    #[must_use]
    pub fn sole_recipient(&self) -> Option<&MailAddress> {
        match self.recipients.as_slice() {
            [only] => Some(&only.address),
            _ => None,
        }
    }

    /// Addresses of the given header role.
    pub fn addresses(&self, kind: RecipientKind) -> impl Iterator<Item = &MailAddress> {
        self.recipients
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| &r.address)
    }
}

/// Merges To, Cc and Bcc into one list, dropping repeated addresses.
///
/// The first occurrence wins; comparison uses [`MailAddress::normalized`].
#[must_use]
pub fn dedup_recipients(
    to: &[MailAddress],
    cc: &[MailAddress],
    bcc: &[MailAddress],
) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    let tagged = to
        .iter()
        .map(|a| (a, RecipientKind::To))
        .chain(cc.iter().map(|a| (a, RecipientKind::Cc)))
        .chain(bcc.iter().map(|a| (a, RecipientKind::Bcc)));

    tagged
        .filter(|(address, _)| seen.insert(address.normalized()))
        .map(|(address, kind)| Recipient {
            address: address.clone(),
            kind,
        })
        .collect()
}

/// Splits a message's recipients into one group per internal locale plus
/// one group of external recipients.
pub struct RecipientSplitter<'a, R: UserResolver> {
    resolver: &'a R,
    context: ContextId,
    sender_locale: Locale,
    external_locale: Option<Locale>,
}

impl<'a, R: UserResolver> RecipientSplitter<'a, R> {
    /// Create a splitter resolving users in `context`.
    #[must_use]
    pub fn new(resolver: &'a R, context: ContextId, sender_locale: Locale) -> Self {
        Self {
            resolver,
            context,
            sender_locale,
            external_locale: None,
        }
    }

    /// Locale of the external group; defaults to the sender's locale.
    #[must_use]
    pub fn with_external_locale(mut self, locale: Option<Locale>) -> Self {
        self.external_locale = locale;
        self
    }

    /// Group the deduplicated recipients.
    ///
    /// Internal groups come first, ordered by locale, followed by the external
    /// group. Never returns an empty list: without any recipient a single
    /// internal group in the sender's locale is returned.
    ///
    /// # Errors
    ///
    /// Propagates resolver errors other than `DirectoryError::NotFound`.
    pub async fn split(
        &self,
        to: &[MailAddress],
        cc: &[MailAddress],
        bcc: &[MailAddress],
    ) -> Result<Vec<RecipientGroup>, DirectoryError> {
        let mut internal: BTreeMap<Locale, Vec<Recipient>> = BTreeMap::new();
        let mut external = Vec::new();

        for recipient in dedup_recipients(to, cc, bcc) {
            match self
                .resolver
                .find_user_by_address(&recipient.address, self.context)
                .await
            {
                Ok(user) => internal.entry(user.locale).or_default().push(recipient),
                Err(DirectoryError::NotFound(_)) => external.push(recipient),
                Err(e) => return Err(e),
            }
        }

        debug!(
            internal_groups = internal.len(),
            external = external.len(),
            "recipients split"
        );

        let mut groups: Vec<RecipientGroup> = internal
            .into_iter()
            .map(|(locale, recipients)| RecipientGroup {
                locale,
                recipients,
                is_external: false,
            })
            .collect();

        if !external.is_empty() {
            groups.push(RecipientGroup {
                locale: self
                    .external_locale
                    .clone()
                    .unwrap_or_else(|| self.sender_locale.clone()),
                recipients: external,
                is_external: true,
            });
        }

        if groups.is_empty() {
            groups.push(RecipientGroup {
                locale: self.sender_locale.clone(),
                recipients: Vec::new(),
                is_external: false,
            });
        }

        Ok(groups)
    }
}
