//! Compose error types.

use attachlink_shared::AppError;
use thiserror::Error;

use crate::publish::PublishError;
use crate::quota::QuotaCheck;
use crate::recipients::DirectoryError;

/// Errors that abort a compose request.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A single attachment is larger than the per-file quota.
    #[error(
        "attachment '{file_name}' of {size} bytes exceeds the per-file upload quota of {limit} bytes"
    )]
    QuotaExceededPerFile {
        /// Offending attachment.
        file_name: String,
        /// Its size in bytes.
        size: u64,
        /// Per-file limit in bytes.
        limit: u64,
    },

    /// The attachments together are larger than the total quota.
    #[error("attachments of {consumed} bytes exceed the upload quota of {limit} bytes")]
    QuotaExceededTotal {
        /// Bytes consumed.
        consumed: u64,
        /// Total limit in bytes.
        limit: u64,
    },

    /// Publishing the attachments failed; nothing stays published.
    #[error("publishing attachments failed: {0}")]
    PublishFailed(#[from] PublishError),

    /// Looking up recipients failed.
    #[error("recipient resolution failed: {0}")]
    UserResolutionFailed(#[from] DirectoryError),

    /// Rendering the link list failed.
    #[error("rendering published links failed: {0}")]
    Render(String),
}

impl ComposeError {
    /// Error for a violated quota check, `None` if the check passed.
    #[must_use]
    pub fn from_quota(check: QuotaCheck, file_name: &str) -> Option<Self> {
        match check {
            QuotaCheck::Within => None,
            QuotaCheck::ExceedsPerFile { size, limit } => Some(Self::QuotaExceededPerFile {
                file_name: file_name.to_string(),
                size,
                limit,
            }),
            QuotaCheck::ExceedsTotal { consumed, limit } => {
                Some(Self::QuotaExceededTotal { consumed, limit })
            }
        }
    }

    /// Create a render error.
    #[must_use]
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Whether this is one of the quota errors.
    #[must_use]
    pub const fn is_quota_error(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceededPerFile { .. } | Self::QuotaExceededTotal { .. }
        )
    }
}

impl From<ComposeError> for AppError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::QuotaExceededPerFile { .. } | ComposeError::QuotaExceededTotal { .. } => {
                Self::QuotaExceeded(err.to_string())
            }
            ComposeError::UserResolutionFailed(DirectoryError::InvalidAddress(_)) => {
                Self::Validation(err.to_string())
            }
            ComposeError::PublishFailed(_) | ComposeError::UserResolutionFailed(_) => {
                Self::ExternalService(err.to_string())
            }
            ComposeError::Render(_) => Self::Internal(err.to_string()),
        }
    }
}
