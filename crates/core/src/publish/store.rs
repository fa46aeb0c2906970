//! Per-attachment publishing through a document store.

use std::sync::Arc;

use attachlink_shared::config::LinkConfig;
use attachlink_shared::types::StorageId;
use tracing::{debug, warn};
use url::Url;

use super::error::{PublishError, ServiceError};
use super::publisher::Publisher;
use super::types::{
    LinkedAttachment, PublishContext, PublishMetadata, PublishRecord, PublishedLinks, Principal,
    StoreMode,
};
use crate::compose::AttachmentPart;

/// Durable document storage for published attachments.
pub trait AttachmentStore: Send + Sync {
    /// Store one attachment and return its identifier.
    fn store(
        &self,
        attachment: &AttachmentPart,
        mode: StoreMode,
        metadata: &PublishMetadata,
        principal: Principal,
    ) -> impl std::future::Future<Output = Result<StorageId, ServiceError>> + Send;

    /// Locator under which the stored document can be downloaded.
    ///
    /// Either an absolute URL or a path relative to the configured link host.
    fn download_locator(
        &self,
        id: &StorageId,
        principal: Principal,
    ) -> impl std::future::Future<Output = Result<String, ServiceError>> + Send;

    /// Delete a stored document.
    fn discard(
        &self,
        id: &StorageId,
        locator: Option<&str>,
        principal: Principal,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;
}

/// Publishes each attachment as its own stored document.
///
/// On a failure every document stored so far is discarded before the
/// error is returned.
pub struct StorePublisher<S: AttachmentStore> {
    store: Arc<S>,
    base_url: String,
    recipient_parameter: Option<String>,
    records: Vec<PublishRecord>,
}

impl<S: AttachmentStore> StorePublisher<S> {
    /// Create a publisher generating links against the configured host.
    #[must_use]
    pub fn new(store: Arc<S>, links: &LinkConfig) -> Self {
        Self {
            store,
            base_url: format!("{}://{}/", links.protocol, links.host.trim_end_matches('/')),
            recipient_parameter: links.recipient_parameter.clone(),
            records: Vec::new(),
        }
    }

    /// Documents published and not yet committed or discarded.
    #[must_use]
    pub fn pending(&self) -> &[PublishRecord] {
        &self.records
    }

    /// Turn a download locator into an absolute link.
    ///
    /// Absolute locators pass through; relative ones are appended to the link
    /// host, keeping any path configured with it.
    pub fn link_for(&self, locator: &str) -> Result<Url, PublishError> {
        match Url::parse(locator) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&self.base_url)
                .and_then(|base| base.join(locator.trim_start_matches('/')))
                .map_err(|_| PublishError::invalid_link(locator)),
            Err(_) => Err(PublishError::invalid_link(locator)),
        }
    }

    async fn publish_one(
        &self,
        attachment: &AttachmentPart,
        mode: StoreMode,
        metadata: &PublishMetadata,
        principal: Principal,
    ) -> Result<(PublishRecord, LinkedAttachment), PublishError> {
        let storage_id = self
            .store
            .store(attachment, mode, metadata, principal)
            .await
            .map_err(|e| PublishError::store(&attachment.file_name, e))?;

        let link = match self.store.download_locator(&storage_id, principal).await {
            Ok(locator) => self.link_for(&locator).map(|url| (locator, url)),
            Err(e) => Err(PublishError::store(&attachment.file_name, e)),
        };

        match link {
            Ok((locator, url)) => Ok((
                PublishRecord {
                    storage_id,
                    locator: Some(locator),
                    principal,
                },
                LinkedAttachment::new(&attachment.file_name, url)
                    .with_recipient_parameter(self.recipient_parameter.clone()),
            )),
            Err(e) => {
                // The document is stored but unreachable; drop it.
                self.discard(PublishRecord {
                    storage_id,
                    locator: None,
                    principal,
                })
                .await;
                Err(e)
            }
        }
    }

    async fn discard(&self, record: PublishRecord) {
        if let Err(e) = self
            .store
            .discard(&record.storage_id, record.locator.as_deref(), record.principal)
            .await
        {
            warn!(storage_id = %record.storage_id, error = %e, "failed to discard published attachment");
        }
    }

    async fn discard_all(&mut self) {
        let records = std::mem::take(&mut self.records);
        for record in records {
            self.discard(record).await;
        }
    }
}

impl<S: AttachmentStore> Publisher for StorePublisher<S> {
    async fn publish_attachments(
        &mut self,
        ctx: &PublishContext<'_>,
        attachments: &[AttachmentPart],
    ) -> Result<PublishedLinks, PublishError> {
        let mode = ctx.expires_at.map_or(StoreMode::Simple, StoreMode::Expiring);
        let metadata = PublishMetadata {
            subject: ctx.subject.to_string(),
            sender: ctx.session.address.email.clone(),
        };
        let principal = ctx.session.principal();

        let mut links = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            match self.publish_one(attachment, mode, &metadata, principal).await {
                Ok((record, link)) => {
                    debug!(storage_id = %record.storage_id, file = %attachment.file_name, "attachment published");
                    self.records.push(record);
                    links.push(link);
                }
                Err(e) => {
                    self.discard_all().await;
                    return Err(e);
                }
            }
        }

        Ok(PublishedLinks {
            links,
            expires_at: ctx.expires_at,
        })
    }

    async fn commit(&mut self) -> Result<(), PublishError> {
        self.records.clear();
        Ok(())
    }

    async fn rollback(&mut self) {
        self.discard_all().await;
    }
}
