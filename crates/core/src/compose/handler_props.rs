//! Property-based tests for the attachment handlers.

use std::sync::Arc;

use attachlink_shared::config::{LinkConfig, QuotaConfig};
use attachlink_shared::types::{ContextId, FolderId, UserId};
use proptest::prelude::*;

use crate::compose::{AttachmentHandler, AttachmentPart, ComposeSession, HandlerSettings, MailDraft};
use crate::i18n::{Catalog, Locale};
use crate::publish::StorePublisher;
use crate::publish::testing::RecordingStore;
use crate::recipients::{MailAddress, StaticDirectory};

fn handler(
    publishing: bool,
    per_file: u64,
    total: u64,
    store: RecordingStore,
) -> (
    AttachmentHandler<StaticDirectory, StorePublisher<RecordingStore>>,
    Arc<RecordingStore>,
) {
    let mut settings = HandlerSettings {
        quota: QuotaConfig::new(per_file, total),
        ..HandlerSettings::default()
    };
    settings.publish.publish_on_exceeded_quota = publishing;
    let session = ComposeSession {
        user: UserId::new(),
        context: ContextId::new(),
        account_id: 0,
        address: MailAddress::new("sender@corp.example"),
        locale: Locale::parse("de_DE"),
        home_folder: FolderId::new("home/"),
    };
    let store = Arc::new(store);
    let publisher = StorePublisher::new(Arc::clone(&store), &LinkConfig::default());
    let handler = AttachmentHandler::new(
        settings,
        session,
        Arc::new(StaticDirectory::new()),
        Arc::new(Catalog),
        publisher,
    );
    (handler, store)
}

fn part(i: usize, size: i64) -> AttachmentPart {
    AttachmentPart::new(format!("f{i}.bin"), "application/octet-stream", Vec::new()).with_size(size)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The abort policy accepts exactly the prefix before the first violation.
    #[test]
    fn prop_abort_accepts_only_prefix_before_violation(
        per_file in 1u64..2_000,
        total in 1u64..5_000,
        sizes in prop::collection::vec(1i64..3_000, 1..12),
    ) {
        let (mut handler, _) = handler(false, per_file, total, RecordingStore::default());

        let mut running = 0u64;
        let mut first_violation = None;
        for (i, size) in sizes.iter().enumerate() {
            let size_u = u64::try_from(*size).unwrap();
            running += size_u;
            if first_violation.is_none() && (size_u > per_file || running > total) {
                first_violation = Some(i);
            }
        }

        for (i, size) in sizes.iter().enumerate() {
            let result = handler.add_attachment(part(i, *size));
            match first_violation {
                Some(v) if i >= v => prop_assert!(result.is_err()),
                _ => prop_assert!(result.is_ok()),
            }
        }

        let accepted = first_violation.unwrap_or(sizes.len());
        prop_assert_eq!(handler.attachments().len(), accepted);
    }

    /// The publishing policy keeps every attachment and never clears the exceeded flag.
    #[test]
    fn prop_exceeded_flag_is_sticky(
        per_file in 1u64..2_000,
        total in 1u64..5_000,
        sizes in prop::collection::vec(0i64..3_000, 1..12),
    ) {
        let (mut handler, _) = handler(true, per_file, total, RecordingStore::default());
        let mut seen_exceeded = false;

        for (i, size) in sizes.iter().enumerate() {
            prop_assert!(handler.add_attachment(part(i, *size)).is_ok());
            if seen_exceeded {
                prop_assert!(handler.quota().is_exceeded());
            }
            seen_exceeded = handler.quota().is_exceeded();
        }
        prop_assert_eq!(handler.attachments().len(), sizes.len());
    }

    /// A store failure on attachment k discards exactly the k-1 earlier publications.
    #[test]
    fn prop_publish_failure_discards_prefix(
        (n, k) in (1usize..8).prop_flat_map(|n| (Just(n), 1..=n)),
    ) {
        let (mut handler, store) = handler(true, 0, 1, RecordingStore::failing_on(k));
        for i in 0..n {
            handler.add_attachment(part(i, 10)).unwrap();
        }

        let result = runtime().block_on(handler.generate_composed_mails(MailDraft {
            to: vec![MailAddress::new("guest@outside.example")],
            ..MailDraft::default()
        }));

        prop_assert!(result.is_err());
        prop_assert_eq!(store.discarded().len(), k - 1);
    }

    /// Without recipients exactly one mail in the sender's locale is produced.
    #[test]
    fn prop_no_recipients_single_mail(
        sizes in prop::collection::vec(1i64..3_000, 1..6),
    ) {
        let (mut handler, _) = handler(true, 0, 1_000, RecordingStore::default());
        for (i, size) in sizes.iter().enumerate() {
            handler.add_attachment(part(i, *size)).unwrap();
        }

        let outcome = runtime()
            .block_on(handler.generate_composed_mails(MailDraft::default()))
            .unwrap();

        prop_assert_eq!(outcome.mails.len(), 1);
        prop_assert_eq!(outcome.mails[0].locale.as_str(), "de_DE");
    }
}
