//! Guest shares persisted as JSON records in object storage.

use attachlink_shared::config::LinkConfig;
use chrono::{DateTime, Utc};
use opendal::{ErrorKind, Operator};
use tracing::debug;
use url::Url;

use super::error::StorageError;
use super::service::StorageService;
use crate::publish::{
    GuestInfo, GuestOptions, GuestShare, Principal, ServiceError, ShareService, ShareTarget,
    ShareUrls,
};

/// Directory holding one `{token}.json` record per share.
const SHARES_DIR: &str = "shares/";

/// Share service whose tokens outlive the process.
///
/// Records live in the same bucket as the shared folders, so any process
/// with access to the storage can resolve a token.
pub struct StorageShareService {
    operator: Operator,
    urls: ShareUrls,
}

impl StorageShareService {
    /// Share service storing records through the operator of `service`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured links do not form a valid URL.
    pub fn new(service: &StorageService, links: &LinkConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            operator: service.operator().clone(),
            urls: ShareUrls::new(links)?,
        })
    }

    /// Look up a live share by token.
    ///
    /// Expired records are deleted and reported as missing.
    pub async fn lookup(&self, token: &str) -> Result<Option<GuestShare>, ServiceError> {
        let Some(path) = record_path(token) else {
            return Ok(None);
        };
        let bytes = match self.operator.read(&path).await {
            Ok(buffer) => buffer.to_vec(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from(e).into()),
        };
        let share: GuestShare = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::failed(format!("corrupt share record {path}: {e}")))?;

        if share.is_expired(Utc::now()) {
            self.operator.delete(&path).await.map_err(StorageError::from)?;
            return Ok(None);
        }
        Ok(Some(share))
    }

    /// Delete every share record expired at `now`; returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let entries = match self.operator.list(SHARES_DIR).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::from(e).into()),
        };

        let mut purged = 0;
        for entry in entries {
            if !entry.path().ends_with(".json") {
                continue;
            }
            let bytes = self
                .operator
                .read(entry.path())
                .await
                .map_err(StorageError::from)?
                .to_vec();
            let expired = serde_json::from_slice::<GuestShare>(&bytes)
                .is_ok_and(|share| share.is_expired(now));
            if expired {
                self.operator
                    .delete(entry.path())
                    .await
                    .map_err(StorageError::from)?;
                purged += 1;
            }
        }

        debug!(purged, "expired shares purged");
        Ok(purged)
    }
}

/// Record path of `token`; `None` for tokens that cannot have been issued.
fn record_path(token: &str) -> Option<String> {
    (!token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| format!("{SHARES_DIR}{token}.json"))
}

impl ShareService for StorageShareService {
    async fn create_guest_link(
        &self,
        principal: Principal,
        target: &ShareTarget,
        options: &GuestOptions,
    ) -> Result<GuestInfo, ServiceError> {
        let share = GuestShare::issue(principal, target, options);
        let path = record_path(&share.info.token)
            .ok_or_else(|| ServiceError::failed("issued token is not alphanumeric"))?;
        let record = serde_json::to_vec(&share)
            .map_err(|e| ServiceError::failed(format!("cannot encode share record: {e}")))?;

        self.operator
            .write_with(&path, record)
            .content_type("application/json")
            .await
            .map_err(StorageError::from)?;
        Ok(share.info)
    }

    fn resolve_url(&self, guest: &GuestInfo, target: &ShareTarget) -> Result<Url, ServiceError> {
        self.urls.resolve(guest, target)
    }

    async fn revoke(&self, guest: &GuestInfo) -> Result<(), ServiceError> {
        let path = record_path(&guest.token).ok_or_else(|| ServiceError::not_found(&guest.token))?;
        match self.operator.stat(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ServiceError::not_found(&guest.token));
            }
            Err(e) => return Err(StorageError::from(e).into()),
        }
        self.operator.delete(&path).await.map_err(StorageError::from)?;
        Ok(())
    }
}
