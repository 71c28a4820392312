//! Explicit type-name to record-type registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::crud::{
    CreateFn, Creator, CrudContext, DefaultHooks, DeleteFn, Deleter, UpdateFn, Updater,
};
use crate::error::{CoreError, CoreResult, CrudResult};
use crate::record::Record;
use crate::schema::ModelSchema;
use crate::value::Attrs;

/// A record type: its descriptor plus one hook per operation.
#[derive(Clone)]
pub struct ModelType {
    schema: &'static ModelSchema,
    creator: Arc<dyn Creator>,
    updater: Arc<dyn Updater>,
    deleter: Arc<dyn Deleter>,
}

impl ModelType {
    /// Creates a record type with bookkeeping-only hooks.
    #[must_use]
    pub fn new(schema: &'static ModelSchema) -> Self {
        Self {
            schema,
            creator: Arc::new(DefaultHooks),
            updater: Arc::new(DefaultHooks),
            deleter: Arc::new(DefaultHooks),
        }
    }

    /// Replaces the create hook.
    #[must_use]
    pub fn with_creator(mut self, creator: impl Creator + 'static) -> Self {
        self.creator = Arc::new(creator);
        self
    }

    /// Replaces the update hook.
    #[must_use]
    pub fn with_updater(mut self, updater: impl Updater + 'static) -> Self {
        self.updater = Arc::new(updater);
        self
    }

    /// Replaces the delete hook.
    #[must_use]
    pub fn with_deleter(mut self, deleter: impl Deleter + 'static) -> Self {
        self.deleter = Arc::new(deleter);
        self
    }

    /// Replaces the create hook with a closure.
    #[must_use]
    pub fn on_create<F>(self, f: F) -> Self
    where
        F: Fn(&CrudContext<'_>, &Attrs, &Attrs) -> CrudResult<Option<Record>>
            + Send
            + Sync
            + 'static,
    {
        self.with_creator(CreateFn(f))
    }

    /// Replaces the update hook with a closure.
    #[must_use]
    pub fn on_update<F>(self, f: F) -> Self
    where
        F: Fn(&CrudContext<'_>, Record, &Attrs) -> CrudResult<Option<Record>>
            + Send
            + Sync
            + 'static,
    {
        self.with_updater(UpdateFn(f))
    }

    /// Replaces the delete hook with a closure.
    #[must_use]
    pub fn on_delete<F>(self, f: F) -> Self
    where
        F: Fn(&CrudContext<'_>, Record) -> CrudResult<Option<Record>> + Send + Sync + 'static,
    {
        self.with_deleter(DeleteFn(f))
    }

    /// Returns the descriptor.
    #[must_use]
    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub(crate) fn creator(&self) -> &dyn Creator {
        self.creator.as_ref()
    }

    pub(crate) fn updater(&self) -> &dyn Updater {
        self.updater.as_ref()
    }

    pub(crate) fn deleter(&self) -> &dyn Deleter {
        self.deleter.as_ref()
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.schema.name)
            .finish_non_exhaustive()
    }
}

/// Mapping from type name to [`ModelType`], built once per adapter kind.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<&'static str, ModelType>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a record type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the descriptor is inconsistent or a type
    /// with the same name is already registered.
    pub fn register(mut self, model: ModelType) -> CoreResult<Self> {
        model.schema.validate()?;
        if self.models.contains_key(model.name()) {
            return Err(CoreError::invalid_schema(model.name(), "registered twice"));
        }
        self.models.insert(model.name(), model);
        Ok(self)
    }

    /// Looks up a record type by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if no such type is registered.
    pub fn get(&self, name: &str) -> CoreResult<&ModelType> {
        self.models
            .get(name)
            .ok_or_else(|| CoreError::unknown_model(name))
    }

    /// Returns the descriptor of a registered type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if no such type is registered.
    pub fn schema(&self, name: &str) -> CoreResult<&'static ModelSchema> {
        self.get(name).map(ModelType::schema)
    }

    /// Returns `true` if a type named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Returns every registered descriptor, sorted by name.
    #[must_use]
    pub fn schemas(&self) -> Vec<&'static ModelSchema> {
        self.models.values().map(ModelType::schema).collect()
    }

    /// Checks that every declared child type is registered.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` for the first unregistered child type.
    pub fn check_references(&self) -> CoreResult<()> {
        for model in self.models.values() {
            for (child_type, _) in model.schema.children {
                if !self.contains(child_type) {
                    return Err(CoreError::unknown_model(*child_type));
                }
            }
        }
        Ok(())
    }
}
