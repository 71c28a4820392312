//! Diff application.
//!
//! The syncer walks a [`Diff`] depth-first and applies each element to the
//! destination adapter through the record type's hooks, keeping parent and
//! child references in the destination store consistent.

use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::adapter::Adapter;
use crate::config::SyncOptions;
use crate::crud::CrudContext;
use crate::diff::{Diff, DiffAction, DiffElement};
use crate::error::{CoreResult, CrudError};
use crate::flags::{ModelFlags, SyncFlags};
use crate::record::Record;
use crate::registry::ModelType;
use crate::status::SyncStatus;

const NO_CHANGE_MESSAGE: &str = "No changes to apply; no action needed";

/// What happened to one diff element during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Record type name.
    pub model: String,
    /// Unique ID of the record.
    pub unique_id: String,
    /// The action attempted, or `None` for unchanged elements.
    pub action: Option<DiffAction>,
    /// Resulting status.
    pub status: SyncStatus,
    /// Status details.
    pub message: String,
}

/// Result of a completed sync.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The diff that was applied.
    pub diff: Diff,
    /// Whether any record was created, updated or deleted.
    pub changed: bool,
    /// One entry per visited element, in visit order.
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    /// Returns the outcomes with the given status.
    pub fn with_status(&self, status: SyncStatus) -> impl Iterator<Item = &SyncOutcome> + '_ {
        self.outcomes.iter().filter(move |o| o.status == status)
    }

    /// Returns the outcome recorded for a record, if it was visited.
    #[must_use]
    pub fn outcome(&self, model: &str, unique_id: &str) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.model == model && o.unique_id == unique_id)
    }
}

/// Applies a [`Diff`] to a destination adapter.
pub struct Syncer<'a> {
    src: &'a Adapter,
    dst: &'a mut Adapter,
    options: &'a SyncOptions,
    span: Span,
    processed: usize,
    total: usize,
    outcomes: Vec<SyncOutcome>,
}

impl<'a> Syncer<'a> {
    /// Prepares to apply diffs from `src` onto `dst`.
    pub fn new(src: &'a Adapter, dst: &'a mut Adapter, options: &'a SyncOptions) -> Self {
        let span = tracing::info_span!(
            "sync",
            src = %src,
            dst = %dst,
            flags = ?options.flags
        );
        Self {
            src,
            dst,
            options,
            span,
            processed: 0,
            total: 0,
            outcomes: Vec::new(),
        }
    }

    /// Applies `diff` and returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns the first CRUD error unless `CONTINUE_ON_FAILURE` is set.
    /// Store and lookup errors are always returned. The destination keeps
    /// whatever was applied before the error.
    pub fn apply(&mut self, diff: &Diff) -> CoreResult<bool> {
        let span = self.span.clone();
        let _guard = span.enter();
        tracing::info!("beginning sync");

        self.processed = 0;
        self.total = diff.len();
        let mut changed = false;
        for element in diff.children() {
            changed |= self.sync_element(element, None)?;
        }

        tracing::info!(changed, "sync complete");
        Ok(changed)
    }

    /// Returns the outcomes recorded so far.
    #[must_use]
    pub fn outcomes(&self) -> &[SyncOutcome] {
        &self.outcomes
    }

    /// Consumes the syncer, returning its outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<SyncOutcome> {
        self.outcomes
    }

    fn sync_element(
        &mut self,
        element: &DiffElement,
        parent: Option<&mut Record>,
    ) -> CoreResult<bool> {
        self.processed += 1;
        self.options.report("sync", self.processed, self.total);

        let model_type = self.dst.model(element.model_type())?.clone();
        let action = element.action();
        let span = tracing::info_span!(
            parent: &self.span,
            "sync_element",
            model = element.model_type(),
            unique_id = element.unique_id(),
            action = action.map_or("none", DiffAction::as_str)
        );
        let _guard = span.enter();

        let mut existing = self.dst.find(element.model_type(), element.unique_id())?;
        if let Some(record) = existing.as_mut() {
            record.set_status(SyncStatus::Unknown, "");
        }
        let src_flags = self
            .src
            .find(element.model_type(), element.unique_id())?
            .map(|r| r.flags())
            .unwrap_or_default();
        let flags = existing.as_ref().map(Record::flags).unwrap_or_default() | src_flags;
        let natural_order = flags.contains(ModelFlags::NATURAL_DELETION_ORDER);
        let skip_children = flags.contains(ModelFlags::SKIP_CHILDREN_ON_DELETE);
        let children_first =
            natural_order && action == Some(DiffAction::Delete) && !skip_children;

        let mut changed = false;
        if children_first {
            if let Some(record) = existing.as_mut() {
                for child in element.children() {
                    changed |= self.sync_element(child, Some(&mut *record))?;
                }
            }
        }

        let (model_changed, result) = self.sync_model(&model_type, element, existing)?;
        changed |= model_changed;
        let Some(mut record) = result else {
            tracing::warn!("no record resulted from sync, will not process child records");
            return Ok(changed);
        };

        match action {
            Some(DiffAction::Create) => {
                if let Some(parent) = parent {
                    parent.add_child(&record)?;
                    self.refresh_parent(parent)?;
                }
                self.dst.add(record.clone())?;
            }
            Some(DiffAction::Update) => {
                self.dst.update(record.clone())?;
            }
            Some(DiffAction::Delete) => {
                if let Some(parent) = parent {
                    parent.remove_child(&record)?;
                    self.refresh_parent(parent)?;
                }
                self.dst.remove(&record, skip_children)?;
                if skip_children {
                    return Ok(changed);
                }
            }
            None => {}
        }

        if !children_first {
            for child in element.children() {
                changed |= self.sync_element(child, Some(&mut record))?;
            }
        }
        Ok(changed)
    }

    fn sync_model(
        &mut self,
        model_type: &ModelType,
        element: &DiffElement,
        existing: Option<Record>,
    ) -> CoreResult<(bool, Option<Record>)> {
        let Some(action) = element.action() else {
            if self.options.flags.contains(SyncFlags::LOG_UNCHANGED_RECORDS) {
                tracing::debug!(status = %SyncStatus::Success, "{NO_CHANGE_MESSAGE}");
            }
            self.record(element, None, SyncStatus::Success, NO_CHANGE_MESSAGE);
            return Ok((false, existing));
        };

        tracing::debug!("attempting model {action}");
        let result = self.invoke(model_type, element, action, existing);

        match result {
            Ok(Some(mut record)) => {
                if record.status().status == SyncStatus::Unknown {
                    record.set_status(SyncStatus::Success, format!("{action} completed"));
                }
                let status = record.status().clone();
                log_status(status.status, &status.message);
                self.record(element, Some(action), status.status, &status.message);
                Ok((true, Some(record)))
            }
            Ok(None) => {
                let message = format!(
                    "{} {action} did not return the model object.",
                    element.model_type()
                );
                log_status(SyncStatus::Failure, &message);
                self.record(element, Some(action), SyncStatus::Failure, &message);
                Ok((true, None))
            }
            Err(err) => {
                let message = err.message().to_string();
                log_status(SyncStatus::Error, &message);
                self.record(element, Some(action), SyncStatus::Error, &message);
                if self.options.flags.contains(SyncFlags::CONTINUE_ON_FAILURE) {
                    Ok((false, None))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn invoke(
        &self,
        model_type: &ModelType,
        element: &DiffElement,
        action: DiffAction,
        existing: Option<Record>,
    ) -> Result<Option<Record>, CrudError> {
        let ctx = CrudContext::new(model_type.schema(), &*self.dst);
        let attrs = element.attrs_diffs().plus;
        let what = format!("{} {}", element.model_type(), element.unique_id());
        match (action, existing) {
            (DiffAction::Create, Some(_)) => Err(CrudError::NotCreated(format!(
                "Failed to create {what} - it already exists!"
            ))),
            (DiffAction::Create, None) => model_type.creator().create(&ctx, element.keys(), &attrs),
            (DiffAction::Update, Some(record)) => model_type.updater().update(&ctx, record, &attrs),
            (DiffAction::Update, None) => Err(CrudError::NotUpdated(format!(
                "Failed to update {what} - not found!"
            ))),
            (DiffAction::Delete, Some(record)) => model_type.deleter().delete(&ctx, record),
            (DiffAction::Delete, None) => Err(CrudError::NotDeleted(format!(
                "Failed to delete {what} - not found!"
            ))),
        }
    }

    /// Writes a modified parent back, unless it has already left the store.
    fn refresh_parent(&mut self, parent: &Record) -> CoreResult<()> {
        if self
            .dst
            .find(parent.model_name(), &parent.unique_id())?
            .is_some()
        {
            self.dst.update(parent.clone())?;
        }
        Ok(())
    }

    fn record(
        &mut self,
        element: &DiffElement,
        action: Option<DiffAction>,
        status: SyncStatus,
        message: &str,
    ) {
        self.outcomes.push(SyncOutcome {
            model: element.model_type().to_string(),
            unique_id: element.unique_id().to_string(),
            action,
            status,
            message: message.to_string(),
        });
    }
}

fn log_status(status: SyncStatus, message: &str) {
    match status {
        SyncStatus::Success => tracing::info!(status = %status, "{message}"),
        SyncStatus::Failure => tracing::warn!(status = %status, "{message}"),
        SyncStatus::Error | SyncStatus::Unknown => tracing::error!(status = %status, "{message}"),
    }
}
