//! Options for diff and sync calls.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::diff::DiffElement;
use crate::flags::SyncFlags;

/// Observer invoked with `(stage, processed, total)`.
///
/// `stage` is `"diff"` or `"sync"`. The callback runs on the calling
/// thread and must not block.
pub type ProgressCallback = Arc<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Comparator used to order sibling diff elements of one type.
pub type ElementComparator = Arc<dyn Fn(&DiffElement, &DiffElement) -> Ordering + Send + Sync>;

/// Per-type ordering rules for iterating diff elements.
///
/// Types without a rule keep first-seen order.
#[derive(Clone, Default)]
pub struct ChildOrdering {
    rules: HashMap<String, ElementComparator>,
}

impl ChildOrdering {
    /// Creates an empty table (insertion order everywhere).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the comparator for elements of `model`.
    #[must_use]
    pub fn with_order<F>(mut self, model: impl Into<String>, cmp: F) -> Self
    where
        F: Fn(&DiffElement, &DiffElement) -> Ordering + Send + Sync + 'static,
    {
        self.rules.insert(model.into(), Arc::new(cmp));
        self
    }

    /// Orders `elements` of `model` in place. The sort is stable.
    pub fn order(&self, model: &str, elements: &mut [&DiffElement]) {
        if let Some(cmp) = self.rules.get(model) {
            elements.sort_by(|a, b| cmp(*a, *b));
        }
    }

    /// Returns `true` if no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for ChildOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut models: Vec<_> = self.rules.keys().collect();
        models.sort();
        f.debug_struct("ChildOrdering").field("models", &models).finish()
    }
}

/// Options for one diff or sync call.
#[derive(Clone, Default)]
pub struct SyncOptions {
    /// Behavior flags.
    pub flags: SyncFlags,
    /// Ordering rules applied when iterating the resulting diff.
    pub ordering: ChildOrdering,
    /// Optional progress observer.
    pub progress: Option<ProgressCallback>,
}

impl SyncOptions {
    /// Creates options with no flags, default ordering and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SyncFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the child ordering table.
    #[must_use]
    pub fn with_ordering(mut self, ordering: ChildOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the progress observer.
    #[must_use]
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(&str, usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub(crate) fn report(&self, stage: &str, processed: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(stage, processed, total);
        }
    }
}

impl From<SyncFlags> for SyncOptions {
    fn from(flags: SyncFlags) -> Self {
        Self::new().with_flags(flags)
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("flags", &self.flags)
            .field("ordering", &self.ordering)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
