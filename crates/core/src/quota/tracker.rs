//! Quota tracker implementation.

use attachlink_shared::config::QuotaConfig;
use tracing::{debug, warn};

/// Outcome of adding one attachment to a [`QuotaTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCheck {
    /// Both limits hold.
    Within,
    /// The attachment alone is larger than the per-file limit.
    ExceedsPerFile {
        /// Attachment size in bytes.
        size: u64,
        /// Per-file limit in bytes.
        limit: u64,
    },
    /// The cumulative size is larger than the total limit.
    ExceedsTotal {
        /// Bytes consumed including this attachment.
        consumed: u64,
        /// Total limit in bytes.
        limit: u64,
    },
}

impl QuotaCheck {
    /// Returns `true` if a limit was violated.
    #[must_use]
    pub const fn is_exceeded(self) -> bool {
        !matches!(self, Self::Within)
    }
}

/// Running counter of cumulative attachment bytes.
///
/// The consumed total only ever grows, whatever the outcome of a check,
/// and the exceeded flag is sticky once set.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    per_file_limit: u64,
    total_limit: u64,
    consumed: u64,
    exceeded: bool,
}

impl QuotaTracker {
    /// Creates a tracker. A limit of zero means unlimited.
    #[must_use]
    pub const fn new(per_file_limit: u64, total_limit: u64) -> Self {
        Self {
            per_file_limit,
            total_limit,
            consumed: 0,
            exceeded: false,
        }
    }

    /// Creates a tracker from configured limits.
    #[must_use]
    pub const fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.per_file_limit, config.total_limit)
    }

    /// Accounts for an attachment of `size` bytes.
    ///
    /// Sizes of zero or below are not yet known; they are logged and cost nothing.
    /// The per-file limit is checked before the total limit.
    pub fn add(&mut self, size: i64) -> QuotaCheck {
        let size = u64::try_from(size).unwrap_or(0);
        if size == 0 {
            warn!("attachment with unknown or non-positive size, not counted against quota");
        }

        self.consumed = self.consumed.saturating_add(size);

        let check = if self.per_file_limit > 0 && size > self.per_file_limit {
            QuotaCheck::ExceedsPerFile {
                size,
                limit: self.per_file_limit,
            }
        } else if self.total_limit > 0 && self.consumed > self.total_limit {
            QuotaCheck::ExceedsTotal {
                consumed: self.consumed,
                limit: self.total_limit,
            }
        } else {
            QuotaCheck::Within
        };

        if check.is_exceeded() {
            self.exceeded = true;
        }

        debug!(size, consumed = self.consumed, ?check, "quota check");
        check
    }

    /// Bytes accounted so far.
    #[must_use]
    pub const fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Whether any add so far violated a limit.
    #[must_use]
    pub const fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    /// Per-file limit in bytes (zero = unlimited).
    #[must_use]
    pub const fn per_file_limit(&self) -> u64 {
        self.per_file_limit
    }

    /// Total limit in bytes (zero = unlimited).
    #[must_use]
    pub const fn total_limit(&self) -> u64 {
        self.total_limit
    }

    /// Bytes left before the total limit is hit, `None` if unlimited.
    #[must_use]
    pub const fn remaining(&self) -> Option<u64> {
        if self.total_limit == 0 {
            None
        } else {
            Some(self.total_limit.saturating_sub(self.consumed))
        }
    }
}
