//! Publisher tests against in-memory collaborators.

use std::sync::Arc;

use attachlink_shared::config::{LinkConfig, ShareLinkConfig};
use attachlink_shared::types::{ContextId, FolderId, UserId};
use chrono::{TimeZone, Utc};
use rstest::rstest;

use super::testing::{MemoryDrive, RecordingStore};
use super::*;
use crate::compose::{AttachmentPart, ComposeSession};
use crate::i18n::Locale;
use crate::recipients::MailAddress;

fn session() -> ComposeSession {
    ComposeSession {
        user: UserId::new(),
        context: ContextId::new(),
        account_id: 0,
        address: MailAddress::new("sender@corp.example"),
        locale: Locale::english(),
        home_folder: FolderId::new("home/"),
    }
}

fn parts(n: usize) -> Vec<AttachmentPart> {
    (1..=n)
        .map(|i| AttachmentPart::new(format!("f{i}.pdf"), "application/pdf", vec![0u8; 8]))
        .collect()
}

fn links() -> LinkConfig {
    LinkConfig {
        host: "mail.example.com".to_string(),
        ..LinkConfig::default()
    }
}

#[rstest]
#[case(1, 3)]
#[case(2, 3)]
#[case(3, 3)]
#[case(5, 5)]
#[tokio::test]
async fn test_store_failure_discards_earlier_documents(#[case] k: usize, #[case] n: usize) {
    let store = Arc::new(RecordingStore::failing_on(k));
    let mut publisher = StorePublisher::new(Arc::clone(&store), &links());
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: None,
    };

    let err = publisher
        .publish_attachments(&ctx, &parts(n))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Store { ref file_name, .. } if *file_name == format!("f{k}.pdf")));
    assert_eq!(store.discarded().len(), k - 1);
    assert!(publisher.pending().is_empty());
}

#[tokio::test]
async fn test_store_publishes_expiring_documents() {
    let store = Arc::new(RecordingStore::default());
    let mut publisher = StorePublisher::new(Arc::clone(&store), &links());
    let session = session();
    let expires_at = Utc.with_ymd_and_hms(2026, 11, 2, 0, 0, 0).unwrap();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: Some(expires_at),
    };

    let published = publisher
        .publish_attachments(&ctx, &parts(2))
        .await
        .unwrap();

    assert_eq!(published.expires_at, Some(expires_at));
    assert_eq!(
        published
            .links
            .iter()
            .map(|l| l.url_for(None))
            .collect::<Vec<_>>(),
        [
            "https://mail.example.com/publish/doc-1-f1.pdf",
            "https://mail.example.com/publish/doc-2-f2.pdf",
        ]
    );
    assert!(
        store
            .stored()
            .iter()
            .all(|(_, mode)| *mode == StoreMode::Expiring(expires_at))
    );
    assert_eq!(publisher.pending().len(), 2);

    publisher.commit().await.unwrap();
    assert!(publisher.pending().is_empty());
    publisher.rollback().await;
    assert!(store.discarded().is_empty());
}

#[tokio::test]
async fn test_store_rollback_after_success_discards_all() {
    let store = Arc::new(RecordingStore::default().with_failing_discard());
    let mut publisher = StorePublisher::new(Arc::clone(&store), &links());
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: None,
    };

    publisher
        .publish_attachments(&ctx, &parts(3))
        .await
        .unwrap();
    publisher.rollback().await;

    // Failed discards are logged and swallowed.
    assert_eq!(store.discarded().len(), 3);
    assert!(publisher.pending().is_empty());
}

#[rstest]
#[case::relative("mail.example.com", "/publish/abc", "https://mail.example.com/publish/abc")]
#[case::absolute(
    "mail.example.com",
    "https://cdn.example.net/x?sig=1",
    "https://cdn.example.net/x?sig=1"
)]
#[case::host_with_path(
    "mail.example.com/appsuite",
    "/publish/abc",
    "https://mail.example.com/appsuite/publish/abc"
)]
#[case::host_with_trailing_slash(
    "mail.example.com/appsuite/",
    "publish/abc",
    "https://mail.example.com/appsuite/publish/abc"
)]
fn test_link_for_locator(#[case] host: &str, #[case] locator: &str, #[case] expected: &str) {
    let links = LinkConfig {
        host: host.to_string(),
        ..LinkConfig::default()
    };
    let publisher = StorePublisher::new(Arc::new(RecordingStore::default()), &links);
    assert_eq!(publisher.link_for(locator).unwrap().as_str(), expected);
}

fn share_publisher(
    drive: &Arc<MemoryDrive>,
    options: ShareLinkConfig,
) -> (
    ShareLinkPublisher<MemoryDrive, MemoryDrive, TokenShareService>,
    Arc<TokenShareService>,
) {
    let shares = Arc::new(TokenShareService::new(&links()).unwrap());
    let publisher = ShareLinkPublisher::new(
        Arc::clone(drive),
        Arc::clone(drive),
        Arc::clone(&shares),
        "Published attachments",
        options,
        &links(),
    );
    (publisher, shares)
}

#[tokio::test]
async fn test_share_link_creates_publishing_folder_and_folder_link() {
    let drive = Arc::new(MemoryDrive::default());
    let (mut publisher, shares) = share_publisher(&drive, ShareLinkConfig::default());
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3 figures",
        expires_at: None,
    };

    publisher.start_transaction().await.unwrap();
    let published = publisher
        .publish_attachments(&ctx, &parts(2))
        .await
        .unwrap();
    publisher.commit().await.unwrap();
    publisher.finish().await;

    assert_eq!(
        drive.folders(),
        [
            "home/Published attachments/",
            "home/Published attachments/Q3 figures/",
        ]
    );
    assert_eq!(published.links.len(), 1);
    assert_eq!(published.links[0].display_name, "Q3 figures");
    let url = published.links[0].url_for(None);
    assert!(url.starts_with("https://mail.example.com/share/"));
    assert_eq!(shares.len(), 1);
    assert!(publisher.created_folder().is_none());
}

#[tokio::test]
async fn test_share_link_retries_taken_folder_names() {
    let drive = Arc::new(MemoryDrive::with_folders(&[
        "home/Published attachments/",
        "home/Published attachments/Q3/",
        "home/Published attachments/Q3 (1)/",
    ]));
    let options = ShareLinkConfig {
        download_links: true,
        ..ShareLinkConfig::default()
    };
    let (mut publisher, _) = share_publisher(&drive, options);
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: None,
    };

    let published = publisher
        .publish_attachments(&ctx, &parts(2))
        .await
        .unwrap();

    assert_eq!(
        publisher.created_folder().map(FolderId::as_str),
        Some("home/Published attachments/Q3 (2)/")
    );
    let names: Vec<&str> = published
        .links
        .iter()
        .map(|l| l.display_name.as_str())
        .collect();
    assert_eq!(names, ["f1.pdf", "f2.pdf"]);
    assert!(published.links[1].url_for(None).ends_with("/f2.pdf"));
}

#[tokio::test]
async fn test_share_link_gives_up_after_bounded_attempts() {
    let drive = Arc::new(MemoryDrive::with_folders(&["home/Published attachments/"]).always_conflicting());
    let options = ShareLinkConfig {
        max_folder_name_attempts: 5,
        ..ShareLinkConfig::default()
    };
    let (mut publisher, shares) = share_publisher(&drive, options);
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: None,
    };

    let err = publisher
        .publish_attachments(&ctx, &parts(1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::FolderNameExhausted { attempts: 5, .. }
    ));
    assert!(shares.is_empty());
}

#[tokio::test]
async fn test_share_link_rollback_removes_folder_and_share() {
    let drive = Arc::new(MemoryDrive::with_folders(&["home/Published attachments/"]).failing_on_save(2));
    let (mut publisher, shares) = share_publisher(&drive, ShareLinkConfig::default());
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: None,
    };

    publisher.start_transaction().await.unwrap();
    let err = publisher
        .publish_attachments(&ctx, &parts(3))
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Store { ref file_name, .. } if file_name == "f2.pdf"));

    publisher.rollback().await;
    publisher.finish().await;

    assert_eq!(drive.folders(), ["home/Published attachments/"]);
    assert!(drive.files().is_empty());
    assert!(shares.is_empty());
    let events = drive.events();
    assert_eq!(&events[events.len() - 2..], ["rollback", "finish"]);
}

#[tokio::test]
async fn test_share_link_rollback_revokes_guest() {
    let drive = Arc::new(MemoryDrive::default());
    let (mut publisher, shares) = share_publisher(&drive, ShareLinkConfig::default());
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "",
        expires_at: None,
    };

    publisher
        .publish_attachments(&ctx, &parts(1))
        .await
        .unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(
        publisher.created_folder().map(FolderId::as_str),
        Some("home/Published attachments/Attachments/")
    );

    publisher.rollback().await;
    assert!(shares.is_empty());
    assert_eq!(drive.folders(), ["home/Published attachments/"]);
}

#[tokio::test]
async fn test_share_link_renames_duplicate_file_names() {
    let drive = Arc::new(MemoryDrive::default());
    let options = ShareLinkConfig {
        download_links: true,
        ..ShareLinkConfig::default()
    };
    let (mut publisher, _) = share_publisher(&drive, options);
    let session = session();
    let ctx = PublishContext {
        session: &session,
        subject: "Q3",
        expires_at: None,
    };
    let same = |_| AttachmentPart::new("image001.png", "image/png", vec![0u8; 8]);

    let published = publisher
        .publish_attachments(&ctx, &(0..3).map(same).collect::<Vec<_>>())
        .await
        .unwrap();

    let names: Vec<&str> = published
        .links
        .iter()
        .map(|l| l.display_name.as_str())
        .collect();
    assert_eq!(names, ["image001.png", "image001 (1).png", "image001 (2).png"]);
    assert_eq!(drive.files().len(), 3);
    assert!(published.links[2].url_for(None).ends_with("/image001%20(2).png"));
}
