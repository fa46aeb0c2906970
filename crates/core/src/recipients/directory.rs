//! User directory lookups.

use std::collections::HashMap;

use attachlink_shared::config::DirectoryConfig;
use attachlink_shared::types::{ContextId, UserId};

use super::address::MailAddress;
use super::error::DirectoryError;
use crate::i18n::Locale;

/// A known user of this groupware instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    /// User ID.
    pub id: UserId,
    /// Primary mail address.
    pub address: MailAddress,
    /// Preferred locale.
    pub locale: Locale,
}

/// Resolves mail addresses to internal users.
///
/// Implementations match the mailbox exactly after IDN normalization
/// and signal unknown addresses with `DirectoryError::NotFound`.
pub trait UserResolver: Send + Sync {
    /// Find the user owning `address` within `context`.
    fn find_user_by_address(
        &self,
        address: &MailAddress,
        context: ContextId,
    ) -> impl std::future::Future<Output = Result<DirectoryUser, DirectoryError>> + Send;
}

/// In-memory directory keyed by normalized address.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: HashMap<String, DirectoryUser>,
}

impl StaticDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from configured entries.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured address cannot be parsed.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let mut directory = Self::new();
        for entry in &config.users {
            let address = MailAddress::parse(&entry.address)?;
            directory.insert(address, Locale::parse(&entry.locale));
        }
        Ok(directory)
    }

    /// Adds a user and returns its generated ID.
    pub fn insert(&mut self, address: MailAddress, locale: Locale) -> UserId {
        let id = UserId::new();
        self.users.insert(
            address.normalized(),
            DirectoryUser {
                id,
                address,
                locale,
            },
        );
        id
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserResolver for StaticDirectory {
    async fn find_user_by_address(
        &self,
        address: &MailAddress,
        _context: ContextId,
    ) -> Result<DirectoryUser, DirectoryError> {
        self.users
            .get(&address.normalized())
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(&address.email))
    }
}
