//! Guest share links and the in-process share registry.

use attachlink_shared::config::LinkConfig;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::error::ServiceError;
use super::sharelink::ShareService;
use super::types::{GuestInfo, GuestOptions, Principal, ShareTarget};

/// A registered guest share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestShare {
    /// Share owner.
    pub owner: Principal,
    /// Share details.
    pub info: GuestInfo,
    /// Password, if any.
    pub password: Option<String>,
}

impl GuestShare {
    /// Share record for a new guest of `owner`.
    #[must_use]
    pub fn issue(owner: Principal, target: &ShareTarget, options: &GuestOptions) -> Self {
        Self {
            owner,
            info: GuestInfo {
                token: Uuid::new_v4().simple().to_string(),
                target: target.clone(),
                expires_at: options.expires_at,
                password_protected: options.password.is_some(),
            },
            password: options.password.clone(),
        }
    }

    /// Whether the share has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.info.expires_at.is_some_and(|at| at <= now)
    }
}

/// Builds guest links of the form `{protocol}://{host}{share_path}/{token}`
/// for a folder and `.../{token}/{file}` for a single file.
#[derive(Debug, Clone)]
pub struct ShareUrls {
    base: Url,
}

impl ShareUrls {
    /// Link builder for the configured host and share path.
    ///
    /// # Errors
    ///
    /// Returns an error if protocol, host and share path do not form a valid URL.
    pub fn new(links: &LinkConfig) -> Result<Self, ServiceError> {
        let path = links.share_path.trim_end_matches('/');
        let base = Url::parse(&format!("{}://{}{path}/", links.protocol, links.host))
            .map_err(|e| ServiceError::failed(format!("invalid share base URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::failed(format!("invalid share base URL: {base}")));
        }
        Ok(Self { base })
    }

    /// URL under which `guest` reaches `target`.
    ///
    /// File names are percent-encoded as a single path segment.
    pub fn resolve(&self, guest: &GuestInfo, target: &ShareTarget) -> Result<Url, ServiceError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ServiceError::failed("share base URL cannot hold a path"))?;
            segments.pop_if_empty().push(&guest.token);
            if let ShareTarget::File { file, .. } = target {
                let name = file.as_str().rsplit('/').next().unwrap_or_default();
                segments.push(name);
            }
        }
        Ok(url)
    }
}

/// Issues random guest tokens and keeps them in memory.
#[derive(Debug)]
pub struct TokenShareService {
    urls: ShareUrls,
    shares: DashMap<String, GuestShare>,
}

impl TokenShareService {
    /// Create a share service generating links from `links`.
    ///
    /// # Errors
    ///
    /// Returns an error if protocol, host and share path do not form a valid URL.
    pub fn new(links: &LinkConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            urls: ShareUrls::new(links)?,
            shares: DashMap::new(),
        })
    }

    /// Look up a live share by token.
    ///
    /// Expired shares are removed and reported as missing.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<GuestShare> {
        let share = self.shares.get(token)?.clone();
        if share.is_expired(Utc::now()) {
            self.shares.remove(token);
            return None;
        }
        Some(share)
    }

    /// Number of registered shares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Whether no shares are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

impl ShareService for TokenShareService {
    async fn create_guest_link(
        &self,
        principal: Principal,
        target: &ShareTarget,
        options: &GuestOptions,
    ) -> Result<GuestInfo, ServiceError> {
        let share = GuestShare::issue(principal, target, options);
        let info = share.info.clone();
        self.shares.insert(info.token.clone(), share);
        Ok(info)
    }

    fn resolve_url(&self, guest: &GuestInfo, target: &ShareTarget) -> Result<Url, ServiceError> {
        self.urls.resolve(guest, target)
    }

    async fn revoke(&self, guest: &GuestInfo) -> Result<(), ServiceError> {
        self.shares
            .remove(&guest.token)
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found(&guest.token))
    }
}

#[cfg(test)]
mod tests {
    use attachlink_shared::types::{ContextId, FileId, FolderId, UserId};
    use chrono::Duration;

    use super::*;

    fn principal() -> Principal {
        Principal {
            user: UserId::new(),
            context: ContextId::new(),
        }
    }

    fn service() -> TokenShareService {
        let links = LinkConfig {
            host: "mail.example.com".to_string(),
            ..LinkConfig::default()
        };
        TokenShareService::new(&links).expect("valid link config")
    }

    #[tokio::test]
    async fn test_folder_and_file_urls() {
        let service = service();
        let folder = ShareTarget::Folder(FolderId::new("home/pub/q3/"));
        let guest = service
            .create_guest_link(principal(), &folder, &GuestOptions::default())
            .await
            .expect("share created");

        let folder_url = service.resolve_url(&guest, &folder).expect("folder url");
        assert_eq!(
            folder_url.as_str(),
            format!("https://mail.example.com/share/{}", guest.token)
        );

        let file = ShareTarget::File {
            folder: FolderId::new("home/pub/q3/"),
            file: FileId::new("report.pdf"),
        };
        let file_url = service.resolve_url(&guest, &file).expect("file url");
        assert!(file_url.as_str().ends_with(&format!("{}/report.pdf", guest.token)));
    }

    #[tokio::test]
    async fn test_file_names_stay_in_the_path() {
        let service = service();
        let folder = ShareTarget::Folder(FolderId::new("f/"));
        let guest = service
            .create_guest_link(principal(), &folder, &GuestOptions::default())
            .await
            .expect("share created");

        let file = ShareTarget::File {
            folder: FolderId::new("f/"),
            file: FileId::new("f/Invoice #12?.pdf"),
        };
        let url = service.resolve_url(&guest, &file).expect("file url");

        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
        assert_eq!(
            url.path(),
            format!("/share/{}/Invoice%20%2312%3F.pdf", guest.token)
        );
    }

    #[test]
    fn test_share_path_below_host_path() {
        let links = LinkConfig {
            host: "mail.example.com".to_string(),
            share_path: "/appsuite/share/".to_string(),
            ..LinkConfig::default()
        };
        let urls = ShareUrls::new(&links).expect("valid link config");
        let guest = GuestShare::issue(
            principal(),
            &ShareTarget::Folder(FolderId::new("f/")),
            &GuestOptions::default(),
        )
        .info;

        let url = urls.resolve(&guest, &guest.target).expect("folder url");
        assert_eq!(url.path(), format!("/appsuite/share/{}", guest.token));
    }

    #[tokio::test]
    async fn test_revoke() {
        let service = service();
        let target = ShareTarget::Folder(FolderId::new("f/"));
        let guest = service
            .create_guest_link(
                principal(),
                &target,
                &GuestOptions {
                    password: Some("secret".to_string()),
                    expires_at: None,
                },
            )
            .await
            .expect("share created");
        assert!(guest.password_protected);
        assert!(service.lookup(&guest.token).is_some());

        service.revoke(&guest).await.expect("revoked");
        assert!(service.lookup(&guest.token).is_none());
        assert!(service.revoke(&guest).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_share_is_dropped() {
        let service = service();
        let target = ShareTarget::Folder(FolderId::new("f/"));
        let guest = service
            .create_guest_link(
                principal(),
                &target,
                &GuestOptions {
                    password: None,
                    expires_at: Some(Utc::now() - Duration::seconds(1)),
                },
            )
            .await
            .expect("share created");

        assert!(service.lookup(&guest.token).is_none());
        assert!(service.is_empty());
    }
}
