//! Application configuration management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Upload quota limits.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Publish-on-exceeded-quota behavior.
    #[serde(default)]
    pub publish: PublishConfig,
    /// Link generation.
    #[serde(default)]
    pub links: LinkConfig,
    /// Object storage for published documents.
    pub storage: StorageSettings,
    /// Outgoing SMTP relay.
    #[serde(default)]
    pub email: EmailConfig,
    /// Statically configured internal users.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// Upload quota limits, in bytes. Zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum size of a single attachment.
    #[serde(default)]
    pub per_file_limit: u64,
    /// Maximum cumulative size of all attachments of one mail.
    #[serde(default)]
    pub total_limit: u64,
}

impl QuotaConfig {
    /// Creates quota limits.
    #[must_use]
    pub const fn new(per_file_limit: u64, total_limit: u64) -> Self {
        Self {
            per_file_limit,
            total_limit,
        }
    }
}

/// How oversized attachments are made available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// One stored document per attachment.
    #[default]
    Publish,
    /// A guest-shared folder holding all attachments.
    ShareLink,
}

/// Publish-on-exceeded-quota configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    /// Replace attachments by links instead of failing when the quota is exceeded.
    #[serde(default)]
    pub publish_on_exceeded_quota: bool,
    /// Only publish for mails sent through the primary account.
    #[serde(default = "default_true")]
    pub publish_primary_account_only: bool,
    /// External recipients receive the attachments themselves instead of links.
    #[serde(default)]
    pub send_attachment_to_external_recipients: bool,
    /// Render the links into a separate `links.html` part instead of the body.
    #[serde(default)]
    pub provide_links_in_attachment: bool,
    /// Whether published documents expire.
    #[serde(default)]
    pub published_documents_expire: bool,
    /// Lifetime of published documents in milliseconds.
    #[serde(default = "default_ttl_millis")]
    pub ttl_millis: u64,
    /// Locale used for the message to external recipients (sender's locale if unset).
    #[serde(default)]
    pub external_recipients_locale: Option<String>,
    /// Name of the folder that receives published attachments.
    #[serde(default = "default_publishing_folder_name")]
    pub publishing_folder_name: String,
    /// Publishing backend.
    #[serde(default)]
    pub mode: PublishMode,
    /// Share link options.
    #[serde(default)]
    pub share_link: ShareLinkConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            publish_on_exceeded_quota: false,
            publish_primary_account_only: true,
            send_attachment_to_external_recipients: false,
            provide_links_in_attachment: false,
            published_documents_expire: false,
            ttl_millis: default_ttl_millis(),
            external_recipients_locale: None,
            publishing_folder_name: default_publishing_folder_name(),
            mode: PublishMode::default(),
            share_link: ShareLinkConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_millis() -> u64 {
    604_800_000 // 7 days
}

fn default_publishing_folder_name() -> String {
    "Published attachments".to_string()
}

/// Share link options.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareLinkConfig {
    /// Hand out one link per file instead of a single folder link.
    #[serde(default)]
    pub download_links: bool,
    /// Optional password protecting the guest share.
    #[serde(default)]
    pub password: Option<String>,
    /// Upper bound for folder name collision retries.
    #[serde(default = "default_max_folder_name_attempts")]
    pub max_folder_name_attempts: u32,
}

impl Default for ShareLinkConfig {
    fn default() -> Self {
        Self {
            download_links: false,
            password: None,
            max_folder_name_attempts: default_max_folder_name_attempts(),
        }
    }
}

fn default_max_folder_name_attempts() -> u32 {
    100
}

/// Link generation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Scheme used for generated links.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Host (and optional port) used for generated links.
    #[serde(default = "default_link_host")]
    pub host: String,
    /// Query parameter carrying the recipient address, if links are personalized.
    #[serde(default)]
    pub recipient_parameter: Option<String>,
    /// Path prefix of guest share links.
    #[serde(default = "default_share_path")]
    pub share_path: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_link_host(),
            recipient_parameter: None,
            share_path: default_share_path(),
        }
    }
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_link_host() -> String {
    "localhost".to_string()
}

fn default_share_path() -> String {
    "/share".to_string()
}

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create S3-compatible provider (Cloudflare R2, Supabase, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Provider name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }

    /// Bucket or container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::AzureBlob { container, .. } => container,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Storage provider.
    pub provider: StorageProvider,
    /// Lifetime of presigned download URLs in seconds.
    #[serde(default = "default_download_ttl_secs")]
    pub download_ttl_secs: u64,
}

fn default_download_ttl_secs() -> u64 {
    604_800 // 7 days
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

/// Statically configured internal users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// Known users.
    #[serde(default)]
    pub users: Vec<DirectoryEntry>,
}

/// One statically configured internal user.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    /// Primary mail address.
    pub address: String,
    /// Preferred locale, e.g. `de_DE`.
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en_US".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ATTACHLINK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
