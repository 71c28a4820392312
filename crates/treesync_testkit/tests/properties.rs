//! Property tests over randomly generated inventories.

use proptest::prelude::*;
use treesync_testkit::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn diff_against_self_is_empty(inventory in inventory_strategy()) {
        let harness = SyncHarness::new(inventory.clone(), inventory);
        let diff = harness.diff(SyncFlags::NONE);
        prop_assert!(!diff.has_diffs());
        prop_assert_eq!(diff.summary().no_change, diff.len());
    }

    #[test]
    fn diff_directions_mirror(
        (source, dest) in inventory_pair_strategy()
    ) {
        let harness = SyncHarness::new(source, dest);
        assert_mirrored(&harness.source, &harness.dest);
    }

    #[test]
    fn sync_converges((source, dest) in inventory_pair_strategy()) {
        let expected = source.record_count();
        let mut harness = SyncHarness::new(source, dest);
        let report = harness.sync(SyncFlags::NONE);

        prop_assert_eq!(report.changed, report.diff.has_diffs());
        harness.assert_converged();
        prop_assert_eq!(harness.dest.count(None).unwrap(), expected);
        prop_assert!(!harness.sync(SyncFlags::NONE).changed);
    }

    #[test]
    fn skip_counts_balance((source, dest) in inventory_pair_strategy()) {
        let harness = SyncHarness::new(source, dest);
        for flags in [
            SyncFlags::NONE,
            SyncFlags::SKIP_UNMATCHED_SRC,
            SyncFlags::SKIP_UNMATCHED_DST,
            SyncFlags::SKIP_UNMATCHED_BOTH,
        ] {
            let diff = harness.diff(flags);
            let summary = diff.summary();
            prop_assert_eq!(summary.elements(), diff.len());
            prop_assert_eq!(summary.elements() + summary.skip, diff.models_processed());
        }
    }

    #[test]
    fn skip_unmatched_both_never_creates_or_deletes(
        (source, dest) in inventory_pair_strategy()
    ) {
        let before = {
            let harness = SyncHarness::new(source.clone(), dest.clone());
            harness.dest.count(None).unwrap()
        };
        let mut harness = SyncHarness::new(source, dest);
        let report = harness.sync(SyncFlags::SKIP_UNMATCHED_BOTH);

        prop_assert_eq!(report.diff.summary().create, 0);
        prop_assert_eq!(report.diff.summary().delete, 0);
        prop_assert_eq!(harness.dest.count(None).unwrap(), before);
    }
}
