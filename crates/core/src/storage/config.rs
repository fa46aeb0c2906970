//! Storage configuration types.

use attachlink_shared::config::StorageSettings;

pub use attachlink_shared::config::StorageProvider;

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Presigned download URL TTL in seconds (default: 604800 = 7 days).
    pub presign_download_ttl_secs: u64,
}

impl StorageConfig {
    /// Default download TTL: 7 days.
    pub const DEFAULT_DOWNLOAD_TTL: u64 = 604_800;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            presign_download_ttl_secs: Self::DEFAULT_DOWNLOAD_TTL,
        }
    }

    /// Storage config from the application settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.provider.clone()).with_download_ttl(settings.download_ttl_secs)
    }

    /// Set presigned download URL TTL.
    #[must_use]
    pub fn with_download_ttl(mut self, secs: u64) -> Self {
        self.presign_download_ttl_secs = secs;
        self
    }
}
