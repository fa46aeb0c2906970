//! Publishing into a guest-shared folder.
//!
//! All attachments of one mail land in a fresh folder below the user's
//! publishing folder. The folder is shared with an anonymous guest and the
//! recipients get either the folder link or one link per file.

use std::sync::Arc;

use attachlink_shared::config::{LinkConfig, ShareLinkConfig};
use attachlink_shared::types::{FileId, FolderId};
use tracing::{debug, warn};
use url::Url;

use super::error::{PublishError, ServiceError};
use super::publisher::Publisher;
use super::types::{
    FolderInfo, GuestInfo, GuestOptions, LinkedAttachment, PublishContext, PublishedLinks,
    Principal, ShareTarget,
};
use crate::compose::AttachmentPart;

/// Folder name used when the mail has no usable subject.
const DEFAULT_FOLDER_NAME: &str = "Attachments";

/// Transaction bracket of a file store view.
pub trait Transactional: Send + Sync {
    /// Begin a transaction.
    fn start_transaction(
        &self,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;

    /// Make the changes of the transaction permanent.
    fn commit(&self) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;

    /// Undo the changes of the transaction.
    fn rollback(&self) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;

    /// Release the transaction.
    fn finish(&self) -> impl std::future::Future<Output = ()> + Send;
}

/// Folder operations of the file store.
pub trait FolderAccess: Transactional {
    /// List the direct subfolders of `parent`.
    fn list_subfolders(
        &self,
        parent: &FolderId,
    ) -> impl std::future::Future<Output = Result<Vec<FolderInfo>, ServiceError>> + Send;

    /// Create folder `name` below `parent`.
    ///
    /// Fails with `ServiceError::Conflict` if the name is taken.
    fn create_folder(
        &self,
        parent: &FolderId,
        name: &str,
    ) -> impl std::future::Future<Output = Result<FolderId, ServiceError>> + Send;

    /// Delete a folder and its content.
    fn delete_folder(
        &self,
        folder: &FolderId,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;
}

/// File operations of the file store.
pub trait FileAccess: Transactional {
    /// Save an attachment as file `name` in `folder`.
    ///
    /// Fails with `ServiceError::Conflict` if the name is taken.
    fn save_file(
        &self,
        folder: &FolderId,
        name: &str,
        attachment: &AttachmentPart,
    ) -> impl std::future::Future<Output = Result<FileId, ServiceError>> + Send;
}

/// Anonymous guest shares.
pub trait ShareService: Send + Sync {
    /// Share `target` with an anonymous guest.
    fn create_guest_link(
        &self,
        principal: Principal,
        target: &ShareTarget,
        options: &GuestOptions,
    ) -> impl std::future::Future<Output = Result<GuestInfo, ServiceError>> + Send;

    /// URL under which the guest reaches `target`.
    fn resolve_url(&self, guest: &GuestInfo, target: &ShareTarget) -> Result<Url, ServiceError>;

    /// Withdraw a guest share.
    fn revoke(
        &self,
        guest: &GuestInfo,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;
}

/// Publishes attachments into a guest-shared folder.
pub struct ShareLinkPublisher<F: FolderAccess, D: FileAccess, S: ShareService> {
    folders: Arc<F>,
    files: Arc<D>,
    shares: Arc<S>,
    publishing_folder_name: String,
    options: ShareLinkConfig,
    recipient_parameter: Option<String>,
    created_folder: Option<FolderId>,
    guest: Option<GuestInfo>,
}

impl<F: FolderAccess, D: FileAccess, S: ShareService> ShareLinkPublisher<F, D, S> {
    /// Create a publisher storing below the folder `publishing_folder_name`.
    #[must_use]
    pub fn new(
        folders: Arc<F>,
        files: Arc<D>,
        shares: Arc<S>,
        publishing_folder_name: impl Into<String>,
        options: ShareLinkConfig,
        links: &LinkConfig,
    ) -> Self {
        Self {
            folders,
            files,
            shares,
            publishing_folder_name: publishing_folder_name.into(),
            options,
            recipient_parameter: links.recipient_parameter.clone(),
            created_folder: None,
            guest: None,
        }
    }

    /// Folder created by the current transaction, if any.
    #[must_use]
    pub fn created_folder(&self) -> Option<&FolderId> {
        self.created_folder.as_ref()
    }

    /// Find the publishing folder below `home`, creating it when missing.
    async fn publishing_folder(&self, home: &FolderId) -> Result<FolderId, PublishError> {
        if let Some(existing) = self.find_subfolder(home, &self.publishing_folder_name).await? {
            return Ok(existing);
        }

        match self
            .folders
            .create_folder(home, &self.publishing_folder_name)
            .await
        {
            Ok(id) => Ok(id),
            // Created concurrently; reuse it.
            Err(ServiceError::Conflict(_)) => self
                .find_subfolder(home, &self.publishing_folder_name)
                .await?
                .ok_or_else(|| ServiceError::not_found(&self.publishing_folder_name).into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_subfolder(
        &self,
        parent: &FolderId,
        name: &str,
    ) -> Result<Option<FolderId>, PublishError> {
        let subfolders = self.folders.list_subfolders(parent).await?;
        Ok(subfolders
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.id))
    }

    /// Create a folder named after `base`, appending ` (n)` until a free name is found.
    async fn create_unique_folder(
        &self,
        parent: &FolderId,
        base: &str,
    ) -> Result<(FolderId, String), PublishError> {
        let taken: Vec<String> = self
            .folders
            .list_subfolders(parent)
            .await?
            .into_iter()
            .map(|f| f.name)
            .collect();

        let attempts = self.options.max_folder_name_attempts.max(1);
        let mut tried = 0;
        for n in 0u32.. {
            if tried == attempts {
                break;
            }
            let name = if n == 0 {
                base.to_string()
            } else {
                format!("{base} ({n})")
            };
            if taken.contains(&name) {
                continue;
            }

            tried += 1;
            match self.folders.create_folder(parent, &name).await {
                Ok(id) => return Ok((id, name)),
                Err(ServiceError::Conflict(_)) => {
                    debug!(name = %name, "folder name taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PublishError::FolderNameExhausted {
            name: base.to_string(),
            attempts,
        })
    }

    /// Save one attachment under its own file transaction.
    ///
    /// A taken file name is retried as `name (n).ext`, bounded like folder names.
    async fn save_file(
        &self,
        folder: &FolderId,
        attachment: &AttachmentPart,
    ) -> Result<(FileId, String), PublishError> {
        let store_error = |e| PublishError::store(&attachment.file_name, e);

        self.files.start_transaction().await.map_err(store_error)?;
        let saved = match self.save_unique(folder, attachment).await {
            Ok(saved) => self.files.commit().await.map(|()| saved),
            Err(e) => Err(e),
        };
        if saved.is_err() {
            if let Err(e) = self.files.rollback().await {
                warn!(error = %e, "failed to roll back file transaction");
            }
        }
        self.files.finish().await;

        saved.map_err(store_error)
    }

    async fn save_unique(
        &self,
        folder: &FolderId,
        attachment: &AttachmentPart,
    ) -> Result<(FileId, String), ServiceError> {
        let attempts = self.options.max_folder_name_attempts.max(1);
        let mut last_conflict = None;
        for n in 0..attempts {
            let name = file_name_candidate(&attachment.file_name, n);
            match self.files.save_file(folder, &name, attachment).await {
                Ok(id) => return Ok((id, name)),
                Err(ServiceError::Conflict(path)) => {
                    debug!(name = %name, "file name taken, retrying");
                    last_conflict = Some(path);
                }
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::conflict(
            last_conflict.unwrap_or_else(|| attachment.file_name.clone()),
        ))
    }

    fn link(
        &self,
        name: &str,
        guest: &GuestInfo,
        target: &ShareTarget,
    ) -> Result<LinkedAttachment, PublishError> {
        let url = self
            .shares
            .resolve_url(guest, target)
            .map_err(PublishError::Share)?;
        Ok(LinkedAttachment::new(name, url)
            .with_recipient_parameter(self.recipient_parameter.clone()))
    }
}

/// File name for the `n`-th save attempt: `report.pdf`, `report (1).pdf`, ...
fn file_name_candidate(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{file_name} ({n})"),
    }
}

/// Folder name derived from a mail subject.
fn folder_name_for(subject: &str) -> String {
    let cleaned: String = subject
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        DEFAULT_FOLDER_NAME.to_string()
    } else {
        cleaned
    }
}

impl<F: FolderAccess, D: FileAccess, S: ShareService> Publisher for ShareLinkPublisher<F, D, S> {
    async fn start_transaction(&mut self) -> Result<(), PublishError> {
        self.folders.start_transaction().await?;
        Ok(())
    }

    async fn publish_attachments(
        &mut self,
        ctx: &PublishContext<'_>,
        attachments: &[AttachmentPart],
    ) -> Result<PublishedLinks, PublishError> {
        let parent = self.publishing_folder(&ctx.session.home_folder).await?;
        let (folder, folder_name) = self
            .create_unique_folder(&parent, &folder_name_for(ctx.subject))
            .await?;
        self.created_folder = Some(folder.clone());

        let mut files = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            files.push(self.save_file(&folder, attachment).await?);
        }

        let folder_target = ShareTarget::Folder(folder.clone());
        let options = GuestOptions {
            password: self.options.password.clone(),
            expires_at: ctx.expires_at,
        };
        let guest = self
            .shares
            .create_guest_link(ctx.session.principal(), &folder_target, &options)
            .await
            .map_err(PublishError::Share)?;
        self.guest = Some(guest.clone());

        let links = if self.options.download_links {
            files
                .into_iter()
                .map(|(file, name)| {
                    let target = ShareTarget::File {
                        folder: folder.clone(),
                        file,
                    };
                    self.link(&name, &guest, &target)
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![self.link(&folder_name, &guest, &folder_target)?]
        };

        debug!(folder = %folder, links = links.len(), "attachments shared");
        Ok(PublishedLinks {
            links,
            expires_at: ctx.expires_at,
        })
    }

    async fn commit(&mut self) -> Result<(), PublishError> {
        self.folders.commit().await?;
        self.created_folder = None;
        self.guest = None;
        Ok(())
    }

    async fn rollback(&mut self) {
        if let Some(guest) = self.guest.take() {
            if let Err(e) = self.shares.revoke(&guest).await {
                warn!(error = %e, "failed to revoke guest share");
            }
        }
        if let Some(folder) = self.created_folder.take() {
            if let Err(e) = self.folders.delete_folder(&folder).await {
                warn!(folder = %folder, error = %e, "failed to delete publishing folder");
            }
        }
        if let Err(e) = self.folders.rollback().await {
            warn!(error = %e, "failed to roll back folder transaction");
        }
    }

    async fn finish(&mut self) {
        self.folders.finish().await;
    }
}
