//! Call-level and record-level flag behavior.

use treesync_core::{CoreError, DiffSummary};
use treesync_testkit::prelude::*;

fn summary(
    create: usize,
    update: usize,
    delete: usize,
    no_change: usize,
    skip: usize,
) -> DiffSummary {
    DiffSummary {
        create,
        update,
        delete,
        no_change,
        skip,
    }
}

fn recording_harness(log: &CallLog, plan: &FaultPlan) -> SyncHarness {
    SyncHarness::with_registry(
        source_inventory(),
        dest_inventory(),
        recording_registry(log, plan),
    )
}

#[test]
fn skip_unmatched_dst_keeps_extra_records() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    let diff = harness.diff(SyncFlags::SKIP_UNMATCHED_DST);
    assert_eq!(diff.summary(), summary(5, 1, 0, 5, 1));
    assert_eq!(diff.models_processed(), 12);

    harness.sync(SyncFlags::SKIP_UNMATCHED_DST);
    assert!(harness.dest.find("site", "atl").unwrap().is_some());
    assert!(harness.dest.find("site", "sfo").unwrap().is_some());
}

#[test]
fn skip_unmatched_src_creates_nothing() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    assert_eq!(
        harness.diff(SyncFlags::SKIP_UNMATCHED_SRC).summary(),
        summary(0, 1, 5, 5, 1)
    );

    harness.sync(SyncFlags::SKIP_UNMATCHED_SRC);
    assert!(harness.dest.find("site", "sfo").unwrap().is_none());
    assert!(harness.dest.find("site", "atl").unwrap().is_none());
}

#[test]
fn skip_unmatched_both_only_updates() {
    let harness = SyncHarness::new(source_inventory(), dest_inventory());
    assert_eq!(
        harness.diff(SyncFlags::SKIP_UNMATCHED_BOTH).summary(),
        summary(0, 1, 0, 5, 2)
    );
}

#[test]
fn record_level_skip_unmatched_dst() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    flag_record(&mut harness.dest, "device", "atl-spine1", ModelFlags::SKIP_UNMATCHED_DST);

    let diff = harness.diff(SyncFlags::NONE);
    let atl = diff.get("site", "atl").unwrap();
    assert!(atl.child_diff().get("device", "atl-spine1").is_none());
    assert!(atl.child_diff().get("device", "atl-leaf1").is_some());
    assert_eq!(diff.summary().skip, 1);
}

#[test]
fn record_level_skip_unmatched_src() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    flag_record(&mut harness.source, "site", "sfo", ModelFlags::SKIP_UNMATCHED_SRC);

    let diff = harness.diff(SyncFlags::NONE);
    assert!(diff.get("site", "sfo").is_none());
    assert_eq!(diff.summary(), summary(0, 1, 5, 5, 1));
}

#[test]
fn ignore_flag_hides_record_and_subtree() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    flag_record(&mut harness.source, "device", "nyc-spine1", ModelFlags::IGNORE);

    let diff = harness.diff(SyncFlags::NONE);
    let nyc = diff.get("site", "nyc").unwrap();
    assert!(nyc.child_diff().get("device", "nyc-spine1").is_none());
    assert_eq!(diff.summary().update, 0);
    assert_eq!(diff.summary().skip, 1);

    harness.sync(SyncFlags::NONE);
    let eth1 = harness.dest.get("interface", "nyc-spine1__eth1").unwrap();
    assert_eq!(eth1.get("description"), Some(&Value::from("storage")));
}

#[test]
fn ignore_flag_on_dest_side() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    flag_record(&mut harness.dest, "site", "atl", ModelFlags::IGNORE);

    harness.sync(SyncFlags::NONE);
    assert!(harness.dest.find("site", "atl").unwrap().is_some());
    assert!(harness.dest.find("device", "atl-leaf1").unwrap().is_some());
}

#[test]
fn parent_deleted_before_children_by_default() {
    let (log, plan) = (CallLog::new(), FaultPlan::new());
    let mut harness = recording_harness(&log, &plan);
    harness.sync(SyncFlags::NONE);

    let site = log.position("delete site atl").unwrap();
    let device = log.position("delete device atl-spine1").unwrap();
    let port = log.position("delete interface atl-spine1__eth0").unwrap();
    assert!(site < device);
    assert!(device < port);
    harness.assert_converged();
}

#[test]
fn natural_deletion_order_deletes_children_first() {
    let (log, plan) = (CallLog::new(), FaultPlan::new());
    let mut harness = recording_harness(&log, &plan);
    flag_record(&mut harness.dest, "site", "atl", ModelFlags::NATURAL_DELETION_ORDER);
    harness.sync(SyncFlags::NONE);

    let site = log.position("delete site atl").unwrap();
    assert!(log.position("delete device atl-spine1").unwrap() < site);
    assert!(log.position("delete device atl-leaf1").unwrap() < site);
    assert!(log.position("delete interface atl-leaf1__eth0").unwrap() < site);
    harness.assert_converged();
}

#[test]
fn skip_children_on_delete_removes_subtree_without_hooks() {
    let (log, plan) = (CallLog::new(), FaultPlan::new());
    let mut harness = recording_harness(&log, &plan);
    flag_record(&mut harness.dest, "site", "atl", ModelFlags::SKIP_CHILDREN_ON_DELETE);
    let report = harness.sync(SyncFlags::NONE);

    assert!(log.contains("delete site atl"));
    assert!(!log.contains("delete device atl-spine1"));
    assert!(report.outcome("device", "atl-spine1").is_none());
    assert!(harness.dest.find("device", "atl-spine1").unwrap().is_none());
    assert!(harness.dest.find("interface", "atl-spine1__eth0").unwrap().is_none());
    harness.assert_converged();
}

#[test]
fn hooks_see_only_changed_attributes() {
    let (log, plan) = (CallLog::new(), FaultPlan::new());
    let mut harness = recording_harness(&log, &plan);
    harness.sync(SyncFlags::NONE);

    assert!(log.contains("update interface nyc-spine1__eth1"));
    assert!(!log.contains("update interface nyc-spine1__eth0"));
    assert!(!log.contains("update site nyc"));
    assert!(log.contains("create interface sfo-leaf1__eth0"));
    assert_eq!(log.entries().len(), 11);
}

#[test]
fn unchanged_parent_with_changed_children_reports_change() {
    let source = Inventory(vec![site(
        "nyc",
        vec![device("nyc-spine1", "spine", vec![iface("eth0", "changed")])],
    )]);
    let dest = Inventory(vec![site(
        "nyc",
        vec![device("nyc-spine1", "spine", vec![iface("eth0", "uplink")])],
    )]);
    let mut harness = SyncHarness::new(source, dest);
    let report = harness.sync(SyncFlags::LOG_UNCHANGED_RECORDS);

    assert!(report.changed);
    assert_eq!(report.outcome("site", "nyc").unwrap().action, None);
    assert_eq!(report.outcome("device", "nyc-spine1").unwrap().action, None);
    harness.assert_converged();
}

#[test]
fn crud_failure_aborts_without_continue_on_failure() {
    let log = CallLog::new();
    let plan = FaultPlan::new().fail(DiffAction::Create, "site", "sfo");
    let mut harness = recording_harness(&log, &plan);

    let err = harness
        .dest
        .sync_from(&harness.source, &SyncOptions::new())
        .unwrap_err();
    assert!(matches!(err, CoreError::Crud(CrudError::NotCreated(_))));
    assert!(err.is_crud());

    // Work done before the failure stays applied.
    let eth1 = harness.dest.get("interface", "nyc-spine1__eth1").unwrap();
    assert_eq!(eth1.get("description"), Some(&Value::from("server")));
    assert!(harness.dest.find("site", "sfo").unwrap().is_none());
    assert!(harness.dest.find("site", "atl").unwrap().is_some());
}

#[test]
fn continue_on_failure_applies_the_rest() {
    let log = CallLog::new();
    let plan = FaultPlan::new().fail(DiffAction::Create, "site", "sfo");
    let mut harness = recording_harness(&log, &plan);
    let report = harness.sync(SyncFlags::CONTINUE_ON_FAILURE);

    assert!(report.changed);
    let sfo = report.outcome("site", "sfo").unwrap();
    assert_eq!(sfo.status, SyncStatus::Error);
    assert!(sfo.message.contains("simulated backend failure"));
    assert!(report.outcome("device", "sfo-spine1").is_none());
    assert!(!log.contains("create device sfo-spine1"));

    assert!(harness.dest.find("site", "sfo").unwrap().is_none());
    assert!(harness.dest.find("site", "atl").unwrap().is_none());
    assert_eq!(harness.dest.count(None).unwrap(), 6);
}

#[test]
fn failed_delete_keeps_record() {
    let log = CallLog::new();
    let plan = FaultPlan::new().fail(DiffAction::Delete, "device", "atl-leaf1");
    let mut harness = recording_harness(&log, &plan);
    let report = harness.sync(SyncFlags::CONTINUE_ON_FAILURE);

    assert_eq!(
        report.outcome("device", "atl-leaf1").unwrap().status,
        SyncStatus::Error
    );
    assert!(harness.dest.find("device", "atl-leaf1").unwrap().is_some());
    assert!(harness.dest.find("device", "atl-spine1").unwrap().is_none());
}

#[test]
fn hook_without_record_is_a_failure() {
    let log = CallLog::new();
    let plan = FaultPlan::new().decline(DiffAction::Create, "device", "sfo-spine1");
    let mut harness = recording_harness(&log, &plan);
    let report = harness.sync(SyncFlags::NONE);

    assert!(report.changed);
    let outcome = report.outcome("device", "sfo-spine1").unwrap();
    assert_eq!(outcome.status, SyncStatus::Failure);
    assert_eq!(outcome.message, "device create did not return the model object.");
    assert!(report.outcome("interface", "sfo-spine1__eth0").is_none());

    let sfo = harness.dest.get("site", "sfo").unwrap();
    assert_eq!(sfo.children("device"), ["sfo-leaf1"]);
    assert!(harness.dest.find("device", "sfo-spine1").unwrap().is_none());
}

#[test]
fn record_flags_survive_a_sync() {
    let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
    flag_record(&mut harness.dest, "device", "nyc-leaf1", ModelFlags::SKIP_UNMATCHED_DST);
    harness.sync(SyncFlags::NONE);

    let leaf = harness.dest.get("device", "nyc-leaf1").unwrap();
    assert!(leaf.flags().contains(ModelFlags::SKIP_UNMATCHED_DST));
}
