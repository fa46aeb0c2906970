//! Folder and file access on top of object storage.

use std::sync::{Mutex, PoisonError};

use attachlink_shared::types::{FileId, FolderId};
use opendal::{ErrorKind, Operator};
use tracing::{debug, warn};

use super::error::StorageError;
use super::service::{StorageService, remove_tree};
use crate::compose::AttachmentPart;
use crate::publish::{FileAccess, FolderAccess, FolderInfo, ServiceError, Transactional};

/// Path-based folders inside the storage bucket.
///
/// Folder IDs are paths ending in `/`, file IDs are full object paths.
#[derive(Clone)]
pub struct StorageDrive {
    operator: Operator,
}

impl StorageDrive {
    /// Drive sharing the operator of `service`.
    #[must_use]
    pub fn new(service: &StorageService) -> Self {
        Self {
            operator: service.operator().clone(),
        }
    }

    /// A fresh transactional view for folder operations.
    #[must_use]
    pub fn folders(&self) -> DriveView {
        DriveView::new(self.operator.clone())
    }

    /// A fresh transactional view for file operations.
    #[must_use]
    pub fn files(&self) -> DriveView {
        DriveView::new(self.operator.clone())
    }
}

#[derive(Debug, Default)]
struct Journal {
    active: bool,
    created: Vec<String>,
}

/// Transactional view on a [`StorageDrive`].
///
/// Objects created inside a transaction are deleted again on rollback.
pub struct DriveView {
    operator: Operator,
    journal: Mutex<Journal>,
}

impl DriveView {
    fn new(operator: Operator) -> Self {
        Self {
            operator,
            journal: Mutex::new(Journal::default()),
        }
    }

    fn record(&self, path: &str) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        if journal.active {
            journal.created.push(path.to_string());
        }
    }

    fn take_created(&self) -> Vec<String> {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut journal.created)
    }

    fn set_active(&self, active: bool) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        journal.active = active;
        journal.created.clear();
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self.operator.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Object name for `name`, with path separators replaced.
fn path_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "attachment".to_string()
    } else {
        cleaned
    }
}

impl Transactional for DriveView {
    async fn start_transaction(&self) -> Result<(), ServiceError> {
        self.set_active(true);
        Ok(())
    }

    async fn commit(&self) -> Result<(), ServiceError> {
        self.take_created();
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ServiceError> {
        let created = self.take_created();
        for path in created.iter().rev() {
            let removed = if path.ends_with('/') {
                remove_tree(&self.operator, path).await
            } else {
                self.operator.delete(path).await.map_err(StorageError::from)
            };
            if let Err(e) = removed {
                warn!(path = %path, error = %e, "failed to undo drive change");
            }
        }
        debug!(undone = created.len(), "drive transaction rolled back");
        Ok(())
    }

    async fn finish(&self) {
        self.set_active(false);
    }
}

impl FolderAccess for DriveView {
    async fn list_subfolders(&self, parent: &FolderId) -> Result<Vec<FolderInfo>, ServiceError> {
        let entries = match self.operator.list(parent.as_str()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from(e).into()),
        };

        Ok(entries
            .into_iter()
            .filter(|e| e.metadata().is_dir() && e.path() != parent.as_str())
            .map(|e| FolderInfo {
                id: FolderId::new(e.path()),
                name: e.name().trim_end_matches('/').to_string(),
            })
            .collect())
    }

    async fn create_folder(&self, parent: &FolderId, name: &str) -> Result<FolderId, ServiceError> {
        let path = format!("{parent}{}/", path_component(name));
        if self.exists(&path).await? {
            return Err(ServiceError::conflict(path));
        }
        self.operator
            .create_dir(&path)
            .await
            .map_err(StorageError::from)?;
        self.record(&path);
        Ok(FolderId::new(path))
    }

    async fn delete_folder(&self, folder: &FolderId) -> Result<(), ServiceError> {
        remove_tree(&self.operator, folder.as_str()).await?;
        Ok(())
    }
}

impl FileAccess for DriveView {
    async fn save_file(
        &self,
        folder: &FolderId,
        name: &str,
        attachment: &AttachmentPart,
    ) -> Result<FileId, ServiceError> {
        let path = format!("{folder}{}", path_component(name));
        if self.exists(&path).await? {
            return Err(ServiceError::conflict(path));
        }
        self.operator
            .write_with(&path, attachment.content().clone())
            .content_type(&attachment.content_type)
            .await
            .map_err(StorageError::from)?;
        self.record(&path);
        Ok(FileId::new(path))
    }
}
