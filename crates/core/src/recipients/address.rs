//! Mail addresses and recipient roles.

use std::fmt;
use std::str::FromStr;

use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use super::error::DirectoryError;

/// A mail address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAddress {
    /// Display name.
    pub name: Option<String>,
    /// Address in `local@domain` form.
    pub email: String,
}

impl MailAddress {
    /// Creates an address without display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse `"Name <local@domain>"` or a bare address.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::InvalidAddress` if the input is not a valid mailbox.
    pub fn parse(input: &str) -> Result<Self, DirectoryError> {
        let mailbox =
            Mailbox::from_str(input).map_err(|_| DirectoryError::invalid_address(input))?;
        Ok(Self {
            name: mailbox.name.filter(|n| !n.is_empty()),
            email: mailbox.email.to_string(),
        })
    }

    /// Key used to compare addresses: lower-cased, with the domain in ASCII (punycode) form.
    #[must_use]
    pub fn normalized(&self) -> String {
        let email = self.email.trim();
        match email.rsplit_once('@') {
            Some((local, domain)) => {
                let domain = idna::domain_to_ascii(domain)
                    .unwrap_or_else(|_| domain.to_string())
                    .to_lowercase();
                format!("{}@{domain}", local.to_lowercase())
            }
            None => email.to_lowercase(),
        }
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Header a recipient was addressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    /// `To` header.
    To,
    /// `Cc` header.
    Cc,
    /// `Bcc` header.
    Bcc,
}

/// A recipient together with its header role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Recipient address.
    pub address: MailAddress,
    /// Header role.
    pub kind: RecipientKind,
}
