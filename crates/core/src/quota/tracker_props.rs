//! Property-based tests for QuotaTracker.

use proptest::prelude::*;

use crate::quota::tracker::{QuotaCheck, QuotaTracker};

/// Strategy for attachment sizes, including unknown (non-positive) ones.
fn arb_size() -> impl Strategy<Value = i64> {
    prop_oneof![
        1 => -100i64..=0,
        9 => 1i64..5_000,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Consumed total after step i equals the sum of the counted sizes so far.
    #[test]
    fn prop_consumed_is_running_sum(
        per_file in 0u64..3_000,
        total in 0u64..10_000,
        sizes in prop::collection::vec(arb_size(), 0..20),
    ) {
        let mut tracker = QuotaTracker::new(per_file, total);
        let mut expected = 0u64;

        for size in sizes {
            tracker.add(size);
            expected += u64::try_from(size.max(0)).unwrap();
            prop_assert_eq!(tracker.consumed(), expected);
        }
    }

    /// Once exceeded, the tracker stays exceeded.
    #[test]
    fn prop_exceeded_is_sticky(
        per_file in 1u64..3_000,
        total in 1u64..10_000,
        sizes in prop::collection::vec(arb_size(), 1..20),
    ) {
        let mut tracker = QuotaTracker::new(per_file, total);
        let mut seen_exceeded = false;

        for size in sizes {
            let check = tracker.add(size);
            seen_exceeded |= check.is_exceeded();
            prop_assert_eq!(tracker.is_exceeded(), seen_exceeded);
        }
    }

    /// A per-file violation is reported whenever a single size is over the limit.
    #[test]
    fn prop_per_file_reported_first(per_file in 1u64..1_000, extra in 1i64..1_000) {
        let mut tracker = QuotaTracker::new(per_file, 1);
        let size = i64::try_from(per_file).unwrap() + extra;
        let is_per_file = matches!(tracker.add(size), QuotaCheck::ExceedsPerFile { .. });
        prop_assert!(is_per_file);
    }
}
