//! Publish error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Failure reported by an external collaborator (store, drive, share service).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Referenced object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An object with the same name already exists.
    #[error("already exists: {0}")]
    Conflict(String),

    /// Collaborator operation failed.
    #[error("operation failed: {0}")]
    Failed(String),

    /// Object storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    /// Create a generic failure.
    #[must_use]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors raised while publishing attachments.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Storing one attachment failed.
    #[error("failed to publish attachment '{file_name}': {source}")]
    Store {
        /// Attachment that could not be stored.
        file_name: String,
        /// Underlying failure.
        #[source]
        source: ServiceError,
    },

    /// Every candidate folder name was taken.
    #[error("no free folder name for '{name}' after {attempts} attempts")]
    FolderNameExhausted {
        /// Requested base name.
        name: String,
        /// Number of names tried.
        attempts: u32,
    },

    /// Creating the guest share failed.
    #[error("failed to create share link: {0}")]
    Share(#[source] ServiceError),

    /// A download locator could not be turned into a link.
    #[error("invalid download link '{0}'")]
    InvalidLink(String),

    /// Other collaborator failure.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl PublishError {
    /// Create a store error.
    #[must_use]
    pub fn store(file_name: impl Into<String>, source: ServiceError) -> Self {
        Self::Store {
            file_name: file_name.into(),
            source,
        }
    }

    /// Create an invalid link error.
    #[must_use]
    pub fn invalid_link(locator: impl Into<String>) -> Self {
        Self::InvalidLink(locator.into())
    }
}
