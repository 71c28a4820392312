//! Cross-crate integration test helpers.
//!
//! Provides a two-adapter harness over the inventory fixtures and
//! assertions about diff symmetry and convergence.

use std::sync::Arc;

use treesync_core::{
    Adapter, Diff, DiffAction, ModelRegistry, SyncFlags, SyncOptions, SyncReport,
};

use crate::fixtures::{loaded_adapter, network_registry, Inventory};

/// A source and a destination adapter loaded from inventories.
pub struct SyncHarness {
    /// The adapter whose state is authoritative.
    pub source: Adapter,
    /// The adapter being brought in line.
    pub dest: Adapter,
}

impl SyncHarness {
    /// Loads both inventories with bookkeeping-only hooks.
    pub fn new(source: Inventory, dest: Inventory) -> Self {
        Self::with_registry(source, dest, network_registry())
    }

    /// Loads both inventories using the given registry.
    pub fn with_registry(source: Inventory, dest: Inventory, registry: Arc<ModelRegistry>) -> Self {
        Self {
            source: loaded_adapter("source", Arc::clone(&registry), &source),
            dest: loaded_adapter("dest", registry, &dest),
        }
    }

    /// Computes the diff from source to destination.
    pub fn diff(&self, flags: SyncFlags) -> Diff {
        self.dest
            .diff_from(&self.source, &SyncOptions::from(flags))
            .expect("Failed to calculate diff")
    }

    /// Syncs source into destination.
    pub fn sync(&mut self, flags: SyncFlags) -> SyncReport {
        self.sync_with(&SyncOptions::from(flags))
    }

    /// Syncs source into destination with full options.
    pub fn sync_with(&mut self, options: &SyncOptions) -> SyncReport {
        self.dest
            .sync_from(&self.source, options)
            .expect("Failed to sync")
    }

    /// Asserts that the destination holds the same records as the source.
    pub fn assert_converged(&self) {
        assert_converged(&self.source, &self.dest);
    }
}

/// Asserts that `dest` has nothing left to change to match `source`.
pub fn assert_converged(source: &Adapter, dest: &Adapter) {
    let diff = dest
        .diff_from(source, &SyncOptions::new())
        .expect("Failed to calculate diff");
    assert!(
        !diff.has_diffs(),
        "{dest} still differs from {source}:\n{diff}"
    );
    assert_eq!(
        source.count(None).expect("Failed to count source"),
        dest.count(None).expect("Failed to count dest"),
        "record counts differ"
    );
}

/// Asserts that diffing in either direction gives mirrored diffs.
///
/// Every element of one direction must exist in the other with the same
/// identity, and with its source and destination attributes swapped.
pub fn assert_mirrored(a: &Adapter, b: &Adapter) {
    let options = SyncOptions::new();
    let forward = b.diff_from(a, &options).expect("Failed to diff forward");
    let backward = a.diff_from(b, &options).expect("Failed to diff backward");
    assert_diffs_mirrored(&forward, &backward);
}

/// Asserts that `backward` is `forward` with the two sides swapped, at
/// every level of the tree.
pub fn assert_diffs_mirrored(forward: &Diff, backward: &Diff) {
    let (f_children, b_children) = (forward.children(), backward.children());
    assert_eq!(
        f_children.len(),
        b_children.len(),
        "element counts differ between directions"
    );

    for fe in f_children {
        let be = backward
            .get(fe.model_type(), fe.name())
            .unwrap_or_else(|| {
                panic!("{} {} missing from reverse diff", fe.model_type(), fe.name())
            });
        let label = format!("{} {}", fe.model_type(), fe.unique_id());

        assert_eq!(fe.unique_id(), be.unique_id(), "{label}: unique id");
        assert_eq!(fe.keys(), be.keys(), "{label}: identifiers");
        assert_eq!(fe.source_attrs(), be.dest_attrs(), "{label}: source mirrors dest");
        assert_eq!(fe.dest_attrs(), be.source_attrs(), "{label}: dest mirrors source");
        assert_eq!(fe.action().map(mirrored_action), be.action(), "{label}: action");

        assert_diffs_mirrored(fe.child_diff(), be.child_diff());
    }
}

fn mirrored_action(action: DiffAction) -> DiffAction {
    match action {
        DiffAction::Create => DiffAction::Delete,
        DiffAction::Delete => DiffAction::Create,
        DiffAction::Update => DiffAction::Update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{dest_inventory, source_inventory};

    #[test]
    fn harness_loads_both_sides() {
        let harness = SyncHarness::new(source_inventory(), dest_inventory());
        assert_eq!(
            harness.source.count(None).unwrap(),
            source_inventory().record_count()
        );
        assert_eq!(
            harness.dest.count(None).unwrap(),
            dest_inventory().record_count()
        );
    }

    #[test]
    fn identical_inventories_are_converged() {
        let harness = SyncHarness::new(source_inventory(), source_inventory());
        harness.assert_converged();
        assert!(!harness.diff(SyncFlags::NONE).has_diffs());
    }

    #[test]
    fn sync_converges_reference_scenario() {
        let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
        let report = harness.sync(SyncFlags::NONE);
        assert!(report.changed);
        harness.assert_converged();
    }

    #[test]
    fn reference_scenario_is_mirrored() {
        let harness = SyncHarness::new(source_inventory(), dest_inventory());
        assert_mirrored(&harness.source, &harness.dest);
    }

    #[test]
    fn mirrored_elements_swap_attributes() {
        let harness = SyncHarness::new(source_inventory(), dest_inventory());
        let forward = harness.diff(SyncFlags::NONE);
        let backward = harness
            .source
            .diff_from(&harness.dest, &SyncOptions::new())
            .unwrap();
        assert_eq!(forward.len(), 16);
        assert_eq!(backward.len(), 16);

        let port = |diff: &Diff| {
            diff.get("site", "nyc")
                .and_then(|s| s.child_diff().get("device", "nyc-spine1"))
                .and_then(|d| d.child_diff().get("interface", "eth1"))
                .map(|i| (i.source_attrs().cloned(), i.dest_attrs().cloned()))
                .unwrap()
        };
        let (f_src, f_dst) = port(&forward);
        let (b_src, b_dst) = port(&backward);
        assert_eq!(f_src, b_dst);
        assert_eq!(f_dst, b_src);
        assert_ne!(f_src, f_dst);

        let sfo = forward.get("site", "sfo").unwrap();
        assert_eq!(sfo.action(), Some(DiffAction::Create));
        assert_eq!(
            backward.get("site", "sfo").unwrap().action(),
            Some(DiffAction::Delete)
        );
    }

    #[test]
    #[should_panic(expected = "source mirrors dest")]
    fn same_direction_is_not_mirrored() {
        let harness = SyncHarness::new(source_inventory(), dest_inventory());
        let forward = harness.diff(SyncFlags::NONE);
        assert_diffs_mirrored(&forward, &forward);
    }
}
