//! Create/update/delete capabilities for record types.
//!
//! Each record type composes one [`Creator`], one [`Updater`] and one
//! [`Deleter`]. [`DefaultHooks`] implements all three with store
//! bookkeeping only; backend-specific hooks perform their side effects and
//! then call into the `default_*` helpers on [`CrudContext`].
//!
//! A hook returns `Ok(Some(record))` on success, `Ok(None)` to stop the
//! syncer from descending into the record's children, or a [`CrudError`].

use crate::adapter::Adapter;
use crate::error::{CrudError, CrudResult};
use crate::record::Record;
use crate::schema::ModelSchema;
use crate::status::SyncStatus;
use crate::value::Attrs;

/// Information handed to a hook invocation.
#[derive(Clone, Copy)]
pub struct CrudContext<'a> {
    schema: &'static ModelSchema,
    adapter: &'a Adapter,
}

impl<'a> CrudContext<'a> {
    pub(crate) fn new(schema: &'static ModelSchema, adapter: &'a Adapter) -> Self {
        Self { schema, adapter }
    }

    /// Returns the descriptor of the record type being operated on.
    #[must_use]
    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    /// Returns the destination adapter.
    #[must_use]
    pub fn adapter(&self) -> &'a Adapter {
        self.adapter
    }

    /// Builds a new record from `ids` and `attrs`.
    ///
    /// # Errors
    ///
    /// Returns `NotCreated` if the values do not form a valid record.
    pub fn default_create(&self, ids: &Attrs, attrs: &Attrs) -> CrudResult<Option<Record>> {
        let mut record = Record::new(self.schema, ids.clone(), attrs.clone())
            .map_err(|e| CrudError::NotCreated(e.to_string()))?;
        record.set_status(SyncStatus::Success, "Created successfully");
        Ok(Some(record))
    }

    /// Applies `attrs` to `record`.
    ///
    /// # Errors
    ///
    /// Returns `NotUpdated` if an attribute cannot be assigned.
    pub fn default_update(&self, mut record: Record, attrs: &Attrs) -> CrudResult<Option<Record>> {
        record
            .set_attrs(attrs)
            .map_err(|e| CrudError::NotUpdated(e.to_string()))?;
        record.set_status(SyncStatus::Success, "Updated successfully");
        Ok(Some(record))
    }

    /// Marks `record` as deleted. Removal from the store is done by the syncer.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other helpers.
    pub fn default_delete(&self, mut record: Record) -> CrudResult<Option<Record>> {
        record.set_status(SyncStatus::Success, "Deleted successfully");
        Ok(Some(record))
    }
}

/// Creates records of one type.
pub trait Creator: Send + Sync {
    /// Creates a record with `ids` and `attrs` in the real backend.
    ///
    /// # Errors
    ///
    /// Returns `NotCreated` when the backend refuses the record.
    fn create(
        &self,
        ctx: &CrudContext<'_>,
        ids: &Attrs,
        attrs: &Attrs,
    ) -> CrudResult<Option<Record>>;
}

/// Updates records of one type.
pub trait Updater: Send + Sync {
    /// Applies the changed `attrs` to `record` in the real backend.
    ///
    /// # Errors
    ///
    /// Returns `NotUpdated` when the backend refuses the change.
    fn update(
        &self,
        ctx: &CrudContext<'_>,
        record: Record,
        attrs: &Attrs,
    ) -> CrudResult<Option<Record>>;
}

/// Deletes records of one type.
pub trait Deleter: Send + Sync {
    /// Deletes `record` from the real backend.
    ///
    /// # Errors
    ///
    /// Returns `NotDeleted` when the backend refuses the deletion.
    fn delete(&self, ctx: &CrudContext<'_>, record: Record) -> CrudResult<Option<Record>>;
}

/// Bookkeeping-only implementation of every hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl Creator for DefaultHooks {
    fn create(
        &self,
        ctx: &CrudContext<'_>,
        ids: &Attrs,
        attrs: &Attrs,
    ) -> CrudResult<Option<Record>> {
        ctx.default_create(ids, attrs)
    }
}

impl Updater for DefaultHooks {
    fn update(
        &self,
        ctx: &CrudContext<'_>,
        record: Record,
        attrs: &Attrs,
    ) -> CrudResult<Option<Record>> {
        ctx.default_update(record, attrs)
    }
}

impl Deleter for DefaultHooks {
    fn delete(&self, ctx: &CrudContext<'_>, record: Record) -> CrudResult<Option<Record>> {
        ctx.default_delete(record)
    }
}

/// Adapts a closure into a [`Creator`].
pub struct CreateFn<F>(pub F);

/// Adapts a closure into an [`Updater`].
pub struct UpdateFn<F>(pub F);

/// Adapts a closure into a [`Deleter`].
pub struct DeleteFn<F>(pub F);

impl<F> Creator for CreateFn<F>
where
    F: Fn(&CrudContext<'_>, &Attrs, &Attrs) -> CrudResult<Option<Record>> + Send + Sync,
{
    fn create(
        &self,
        ctx: &CrudContext<'_>,
        ids: &Attrs,
        attrs: &Attrs,
    ) -> CrudResult<Option<Record>> {
        (self.0)(ctx, ids, attrs)
    }
}

impl<F> Updater for UpdateFn<F>
where
    F: Fn(&CrudContext<'_>, Record, &Attrs) -> CrudResult<Option<Record>> + Send + Sync,
{
    fn update(
        &self,
        ctx: &CrudContext<'_>,
        record: Record,
        attrs: &Attrs,
    ) -> CrudResult<Option<Record>> {
        (self.0)(ctx, record, attrs)
    }
}

impl<F> Deleter for DeleteFn<F>
where
    F: Fn(&CrudContext<'_>, Record) -> CrudResult<Option<Record>> + Send + Sync,
{
    fn delete(&self, ctx: &CrudContext<'_>, record: Record) -> CrudResult<Option<Record>> {
        (self.0)(ctx, record)
    }
}
