//! Property-based tests for RecipientSplitter.

use std::collections::HashMap;

use attachlink_shared::types::ContextId;
use proptest::prelude::*;

use crate::i18n::Locale;
use crate::recipients::address::MailAddress;
use crate::recipients::directory::StaticDirectory;
use crate::recipients::splitter::RecipientSplitter;

const INTERNAL: [(&str, &str); 4] = [
    ("anna@corp.example", "de_DE"),
    ("ben@corp.example", "en_US"),
    ("chloe@corp.example", "fr_FR"),
    ("dirk@corp.example", "de_DE"),
];

/// Strategy for an address drawn from a small pool of internal and external
/// addresses, with random letter case.
fn arb_address() -> impl Strategy<Value = MailAddress> {
    let pool = prop_oneof![
        (0..INTERNAL.len()).prop_map(|i| INTERNAL[i].0.to_string()),
        (0u8..6).prop_map(|i| format!("guest{i}@outside.example")),
    ];
    (pool, any::<bool>()).prop_map(|(email, upper)| {
        if upper {
            MailAddress::new(email.to_uppercase())
        } else {
            MailAddress::new(email)
        }
    })
}

fn directory() -> StaticDirectory {
    let mut directory = StaticDirectory::new();
    for (address, locale) in INTERNAL {
        directory.insert(MailAddress::new(address), Locale::parse(locale));
    }
    directory
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every deduplicated recipient appears in exactly one group, and nothing else does.
    #[test]
    fn prop_grouping_is_complete_and_disjoint(
        to in prop::collection::vec(arb_address(), 0..6),
        cc in prop::collection::vec(arb_address(), 0..6),
        bcc in prop::collection::vec(arb_address(), 0..6),
    ) {
        let directory = directory();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let groups = runtime
            .block_on(
                RecipientSplitter::new(&directory, ContextId::new(), Locale::english())
                    .split(&to, &cc, &bcc),
            )
            .unwrap();

        let mut occurrences: HashMap<String, usize> = HashMap::new();
        for group in &groups {
            for recipient in &group.recipients {
                *occurrences.entry(recipient.address.normalized()).or_default() += 1;
            }
        }

        let expected: std::collections::HashSet<String> =
            to.iter().chain(&cc).chain(&bcc).map(MailAddress::normalized).collect();

        prop_assert_eq!(occurrences.len(), expected.len());
        for key in &expected {
            prop_assert_eq!(occurrences.get(key).copied(), Some(1));
        }
        prop_assert!(!groups.is_empty());
        prop_assert!(groups.iter().filter(|g| g.is_external).count() <= 1);
    }

    /// Internal groups never share a locale.
    #[test]
    fn prop_one_group_per_locale(to in prop::collection::vec(arb_address(), 1..10)) {
        let directory = directory();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let groups = runtime
            .block_on(
                RecipientSplitter::new(&directory, ContextId::new(), Locale::english())
                    .split(&to, &[], &[]),
            )
            .unwrap();

        let internal: Vec<_> = groups.iter().filter(|g| !g.is_external).map(|g| &g.locale).collect();
        let mut unique = internal.clone();
        unique.dedup();
        prop_assert_eq!(internal.len(), unique.len());
    }
}
