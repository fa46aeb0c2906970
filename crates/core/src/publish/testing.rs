//! In-memory collaborators for tests.

use std::collections::BTreeSet;
use std::sync::Mutex;

use attachlink_shared::types::{FileId, FolderId, StorageId};

use super::error::ServiceError;
use super::sharelink::{FileAccess, FolderAccess, Transactional};
use super::store::AttachmentStore;
use super::types::{FolderInfo, Principal, PublishMetadata, StoreMode};
use crate::compose::AttachmentPart;

#[derive(Debug, Default)]
struct StoreLog {
    store_calls: usize,
    stored: Vec<(StorageId, StoreMode)>,
    discarded: Vec<StorageId>,
}

/// Attachment store recording every call, optionally failing on the n-th store (1-based).
#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    log: Mutex<StoreLog>,
    fail_on_store: Option<usize>,
    fail_discard: bool,
}

impl RecordingStore {
    pub(crate) fn failing_on(n: usize) -> Self {
        Self {
            fail_on_store: Some(n),
            ..Self::default()
        }
    }

    pub(crate) fn with_failing_discard(mut self) -> Self {
        self.fail_discard = true;
        self
    }

    pub(crate) fn stored(&self) -> Vec<(StorageId, StoreMode)> {
        self.log.lock().unwrap().stored.clone()
    }

    pub(crate) fn discarded(&self) -> Vec<StorageId> {
        self.log.lock().unwrap().discarded.clone()
    }
}

impl AttachmentStore for RecordingStore {
    async fn store(
        &self,
        attachment: &AttachmentPart,
        mode: StoreMode,
        _metadata: &PublishMetadata,
        _principal: Principal,
    ) -> Result<StorageId, ServiceError> {
        let mut log = self.log.lock().unwrap();
        log.store_calls += 1;
        if Some(log.store_calls) == self.fail_on_store {
            return Err(ServiceError::failed("disk full"));
        }
        let id = StorageId::new(format!("doc-{}-{}", log.store_calls, attachment.file_name));
        log.stored.push((id.clone(), mode));
        Ok(id)
    }

    async fn download_locator(
        &self,
        id: &StorageId,
        _principal: Principal,
    ) -> Result<String, ServiceError> {
        Ok(format!("/publish/{id}"))
    }

    async fn discard(
        &self,
        id: &StorageId,
        _locator: Option<&str>,
        _principal: Principal,
    ) -> Result<(), ServiceError> {
        let mut log = self.log.lock().unwrap();
        log.discarded.push(id.clone());
        if self.fail_discard {
            return Err(ServiceError::failed("store offline"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DriveState {
    folders: BTreeSet<String>,
    files: BTreeSet<String>,
    saves: usize,
    events: Vec<&'static str>,
}

/// Path-based in-memory folder and file store.
#[derive(Debug, Default)]
pub(crate) struct MemoryDrive {
    state: Mutex<DriveState>,
    fail_on_save: Option<usize>,
    always_conflict: bool,
}

impl MemoryDrive {
    pub(crate) fn with_folders(paths: &[&str]) -> Self {
        let drive = Self::default();
        drive
            .state
            .lock()
            .unwrap()
            .folders
            .extend(paths.iter().map(ToString::to_string));
        drive
    }

    pub(crate) fn failing_on_save(mut self, n: usize) -> Self {
        self.fail_on_save = Some(n);
        self
    }

    pub(crate) fn always_conflicting(mut self) -> Self {
        self.always_conflict = true;
        self
    }

    pub(crate) fn folders(&self) -> Vec<String> {
        self.state.lock().unwrap().folders.iter().cloned().collect()
    }

    pub(crate) fn files(&self) -> Vec<String> {
        self.state.lock().unwrap().files.iter().cloned().collect()
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().events.clone()
    }

    fn record(&self, event: &'static str) {
        self.state.lock().unwrap().events.push(event);
    }
}

impl Transactional for MemoryDrive {
    async fn start_transaction(&self) -> Result<(), ServiceError> {
        self.record("start");
        Ok(())
    }

    async fn commit(&self) -> Result<(), ServiceError> {
        self.record("commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ServiceError> {
        self.record("rollback");
        Ok(())
    }

    async fn finish(&self) {
        self.record("finish");
    }
}

impl FolderAccess for MemoryDrive {
    async fn list_subfolders(&self, parent: &FolderId) -> Result<Vec<FolderInfo>, ServiceError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .iter()
            .filter_map(|path| {
                let rest = path.strip_prefix(parent.as_str())?;
                let name = rest.strip_suffix('/')?;
                (!name.is_empty() && !name.contains('/')).then(|| FolderInfo {
                    id: FolderId::new(path.clone()),
                    name: name.to_string(),
                })
            })
            .collect())
    }

    async fn create_folder(&self, parent: &FolderId, name: &str) -> Result<FolderId, ServiceError> {
        let path = format!("{parent}{name}/");
        let mut state = self.state.lock().unwrap();
        if self.always_conflict || !state.folders.insert(path.clone()) {
            return Err(ServiceError::conflict(path));
        }
        Ok(FolderId::new(path))
    }

    async fn delete_folder(&self, folder: &FolderId) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.folders.retain(|p| !p.starts_with(folder.as_str()));
        state.files.retain(|p| !p.starts_with(folder.as_str()));
        Ok(())
    }
}

impl FileAccess for MemoryDrive {
    async fn save_file(
        &self,
        folder: &FolderId,
        name: &str,
        _attachment: &AttachmentPart,
    ) -> Result<FileId, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.saves += 1;
        if Some(state.saves) == self.fail_on_save {
            return Err(ServiceError::failed("quota of drive exceeded"));
        }
        let path = format!("{folder}{name}");
        if !state.files.insert(path.clone()) {
            return Err(ServiceError::conflict(path));
        }
        Ok(FileId::new(path))
    }
}
