//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use attachlink_shared::types::{DocumentId, StorageId};
use chrono::{DateTime, Utc};
use opendal::{ErrorKind, Operator, services};
use tracing::{debug, warn};

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use crate::compose::AttachmentPart;
use crate::publish::{AttachmentStore, Principal, PublishMetadata, ServiceError, StoreMode};

/// Path prefix of download locators for providers without presigning.
const PUBLISH_PATH: &str = "/publish/";

/// Suffix of the marker file holding a document's expiry instant.
const EXPIRY_SUFFIX: &str = ".expires";

/// Presigned download URL.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL.
    pub url: String,
    /// HTTP method to use.
    pub method: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

/// Object storage for published attachments.
///
/// Documents live under `{context}/{user}/{document}/{file name}`; an
/// expiring document has a sibling `{context}/{user}/{document}.expires`
/// marker holding its expiry instant.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
        }
    }

    /// Generate the storage key of a published document.
    ///
    /// Format: `{context}/{user}/{document}/{sanitized_filename}`
    #[must_use]
    pub fn storage_key(principal: Principal, document: DocumentId, filename: &str) -> String {
        format!(
            "{}/{}/{document}/{}",
            principal.context,
            principal.user,
            sanitize_filename(filename)
        )
    }

    /// Generate presigned URL for download.
    ///
    /// # Errors
    ///
    /// Returns an error if presigning is not supported or fails.
    pub async fn presign_download(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        let ttl = Duration::from_secs(self.config.presign_download_ttl_secs);

        let presigned = self
            .operator
            .presign_read(key, ttl)
            .await
            .map_err(StorageError::from)?;

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            method: presigned.method().to_string(),
            expires_at: Utc::now()
                + chrono::Duration::seconds(
                    i64::try_from(self.config.presign_download_ttl_secs).unwrap_or(i64::MAX),
                ),
        })
    }

    /// Read a stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not exist or cannot be read.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(key).await.map_err(StorageError::from)?;
        Ok(buffer.to_vec())
    }

    /// Delete a file from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Check if a file exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        match self.operator.stat(key).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(key = %key, error = %e, "stat failed");
                false
            }
        }
    }

    /// Delete every document whose expiry lies before `now`.
    ///
    /// Returns the number of purged documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be listed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let entries = self
            .operator
            .list_with("/")
            .recursive(true)
            .await
            .map_err(StorageError::from)?;

        let mut purged = 0;
        for entry in entries {
            let Some(document_dir) = entry.path().strip_suffix(EXPIRY_SUFFIX) else {
                continue;
            };
            let marker = self.read(entry.path()).await?;
            let expired = std::str::from_utf8(&marker)
                .ok()
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                .is_some_and(|at| at <= now);
            if expired {
                remove_tree(&self.operator, &format!("{document_dir}/")).await?;
                self.delete(entry.path()).await?;
                purged += 1;
            }
        }

        debug!(purged, "expired documents purged");
        Ok(purged)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Underlying operator, shared with [`StorageDrive`](super::StorageDrive).
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Document directory of a key owned by `principal`.
    fn owned_document_dir<'k>(key: &'k str, principal: Principal) -> Result<&'k str, StorageError> {
        let owner = format!("{}/{}/", principal.context, principal.user);
        if !key.starts_with(&owner) {
            return Err(StorageError::forbidden(key));
        }
        key.rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| dir.len() > owner.len())
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))
    }
}

impl AttachmentStore for StorageService {
    async fn store(
        &self,
        attachment: &AttachmentPart,
        mode: StoreMode,
        metadata: &PublishMetadata,
        principal: Principal,
    ) -> Result<StorageId, ServiceError> {
        let document = DocumentId::new();
        let key = Self::storage_key(principal, document, &attachment.file_name);

        self.operator
            .write_with(&key, attachment.content().clone())
            .content_type(&attachment.content_type)
            .await
            .map_err(StorageError::from)?;

        if let StoreMode::Expiring(at) = mode {
            let marker = format!(
                "{}/{}/{document}{EXPIRY_SUFFIX}",
                principal.context, principal.user
            );
            if let Err(e) = self.operator.write(&marker, at.to_rfc3339().into_bytes()).await {
                // Without its marker the document would never expire.
                if let Err(cleanup) = self.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "failed to remove unmarked document");
                }
                return Err(StorageError::from(e).into());
            }
        }

        debug!(
            key = %key,
            subject = %metadata.subject,
            sender = %metadata.sender,
            provider = self.provider_name(),
            "document stored"
        );
        Ok(StorageId::new(key))
    }

    async fn download_locator(
        &self,
        id: &StorageId,
        principal: Principal,
    ) -> Result<String, ServiceError> {
        Self::owned_document_dir(id.as_str(), principal)?;
        if !self.exists(id.as_str()).await {
            return Err(StorageError::not_found(id.as_str()).into());
        }

        match self.presign_download(id.as_str()).await {
            Ok(presigned) => Ok(presigned.url),
            Err(StorageError::PresignNotSupported) => Ok(format!("{PUBLISH_PATH}{id}")),
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(
        &self,
        id: &StorageId,
        _locator: Option<&str>,
        principal: Principal,
    ) -> Result<(), ServiceError> {
        let document_dir = Self::owned_document_dir(id.as_str(), principal)?;
        remove_tree(&self.operator, &format!("{document_dir}/")).await?;
        self.delete(&format!("{document_dir}{EXPIRY_SUFFIX}")).await?;
        debug!(key = %id, "document discarded");
        Ok(())
    }
}

/// Delete `dir` and everything below it.
pub(super) async fn remove_tree(operator: &Operator, dir: &str) -> Result<(), StorageError> {
    let entries = match operator.list_with(dir).recursive(true).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut paths: Vec<(String, bool)> = entries
        .into_iter()
        .map(|e| {
            let is_dir = e.metadata().is_dir();
            (e.path().to_string(), is_dir)
        })
        .filter(|(path, _)| path != dir)
        .collect();
    // Files before directories, deepest paths first.
    paths.sort_by(|(a, a_dir), (b, b_dir)| a_dir.cmp(b_dir).then(b.len().cmp(&a.len())));

    for (path, _) in paths {
        operator.delete(&path).await?;
    }
    operator.delete(dir).await?;
    Ok(())
}

/// Sanitize filename for storage key.
///
/// Removes or replaces characters that could cause issues in storage paths.
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
pub(super) fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "attachment".to_string()
    } else {
        sanitized
    }
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
