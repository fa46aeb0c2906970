//! Directory error types.

use thiserror::Error;

/// Errors raised while resolving recipients to users.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No user exists for the address.
    #[error("no user found for address {0}")]
    NotFound(String),

    /// The directory could not be queried.
    #[error("user directory unavailable: {0}")]
    Unavailable(String),

    /// The address could not be parsed.
    #[error("invalid mail address: {0}")]
    InvalidAddress(String),
}

impl DirectoryError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(address: impl Into<String>) -> Self {
        Self::NotFound(address.into())
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress(address.into())
    }
}
