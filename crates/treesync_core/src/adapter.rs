//! Adapters: one record store plus identity and load logic for a backend.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::SyncOptions;
use crate::diff::Diff;
use crate::differ::Differ;
use crate::error::{CoreError, CoreResult};
use crate::flags::SyncFlags;
use crate::record::Record;
use crate::registry::{ModelRegistry, ModelType};
use crate::store::{LocalStore, RecordStore};
use crate::syncer::{SyncReport, Syncer};
use crate::value::Attrs;

/// Serialized adapter contents: `{type: {unique_id: {field: value}}}`.
pub type Snapshot = BTreeMap<String, BTreeMap<String, Attrs>>;

/// Callback run on the destination after a sync that changed something.
///
/// Receives `(source, destination, applied diff, flags)`.
pub type SyncCompleteHook = Arc<dyn Fn(&Adapter, &Adapter, &Diff, SyncFlags) + Send + Sync>;

/// Backend-specific routine that populates an adapter.
pub trait Loader {
    /// Loads records into `adapter`.
    ///
    /// # Errors
    ///
    /// Returns whatever the backend or the store reports.
    fn load(&mut self, adapter: &mut Adapter) -> CoreResult<()>;
}

impl<F> Loader for F
where
    F: FnMut(&mut Adapter) -> CoreResult<()>,
{
    fn load(&mut self, adapter: &mut Adapter) -> CoreResult<()> {
        self(adapter)
    }
}

/// Owner of one record store plus the metadata of one backend.
pub struct Adapter {
    kind: String,
    name: String,
    top_level: Vec<String>,
    registry: Arc<ModelRegistry>,
    store: Box<dyn RecordStore>,
    sync_complete: Option<SyncCompleteHook>,
}

impl Adapter {
    /// Creates an adapter backed by a [`LocalStore`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if a top-level or child type is not registered.
    pub fn new<I, S>(
        kind: impl Into<String>,
        name: impl Into<String>,
        top_level: I,
        registry: Arc<ModelRegistry>,
    ) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_store(kind, name, top_level, registry, Box::new(LocalStore::new()))
    }

    /// Creates an adapter backed by the given store.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if a top-level or child type is not registered.
    pub fn with_store<I, S>(
        kind: impl Into<String>,
        name: impl Into<String>,
        top_level: I,
        registry: Arc<ModelRegistry>,
        mut store: Box<dyn RecordStore>,
    ) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let kind = kind.into();
        let name = name.into();
        let top_level: Vec<String> = top_level.into_iter().map(Into::into).collect();

        registry.check_references()?;
        for model in &top_level {
            registry.get(model)?;
        }
        store.attach(&name, &registry.schemas());

        Ok(Self {
            kind,
            name,
            top_level,
            registry,
            store,
            sync_complete: None,
        })
    }

    /// Returns the adapter kind, e.g. the backend type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the adapter instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the types the differ and syncer start from.
    #[must_use]
    pub fn top_level(&self) -> &[String] {
        &self.top_level
    }

    /// Returns the record type registry.
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Looks up a registered record type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if `name` is not registered.
    pub fn model(&self, name: &str) -> CoreResult<&ModelType> {
        self.registry.get(name)
    }

    /// Sets the callback run after a sync that changed something.
    pub fn set_sync_complete<F>(&mut self, hook: F)
    where
        F: Fn(&Adapter, &Adapter, &Diff, SyncFlags) + Send + Sync + 'static,
    {
        self.sync_complete = Some(Arc::new(hook));
    }

    /// Runs a backend load routine against this adapter.
    ///
    /// # Errors
    ///
    /// Returns whatever the loader reports.
    pub fn load_with(&mut self, mut loader: impl Loader) -> CoreResult<()> {
        loader.load(self)?;
        tracing::debug!(adapter = %self, records = self.count(None)?, "load complete");
        Ok(())
    }

    /// Builds a record of a registered type without storing it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` or `MissingIdentifier`.
    pub fn instantiate(&self, model: &str, ids: Attrs, attrs: Attrs) -> CoreResult<Record> {
        Record::new(self.registry.schema(model)?, ids, attrs)
    }

    /// Returns a stored record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it is absent.
    pub fn get(&self, model: &str, uid: &str) -> CoreResult<Record> {
        self.find(model, uid)?
            .ok_or_else(|| CoreError::not_found(model, uid))
    }

    /// Returns a stored record, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns store read errors.
    pub fn find(&self, model: &str, uid: &str) -> CoreResult<Option<Record>> {
        self.store.get(model, uid)
    }

    /// Returns a stored record by identifier values.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel`, `MissingIdentifier` or `NotFound`.
    pub fn get_by_keys(&self, model: &str, keys: &Attrs) -> CoreResult<Record> {
        let uid = self.registry.schema(model)?.unique_id(keys)?;
        self.get(model, &uid)
    }

    /// Returns every record of a type.
    ///
    /// # Errors
    ///
    /// Returns store read errors.
    pub fn get_all(&self, model: &str) -> CoreResult<Vec<Record>> {
        self.store.get_all(model)
    }

    /// Returns records by unique ID, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the first missing ID.
    pub fn get_by_uids(&self, model: &str, uids: &[String]) -> CoreResult<Vec<Record>> {
        self.store.get_by_uids(model, uids)
    }

    /// Adds a record to the store.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a different record has the same ID.
    pub fn add(&mut self, record: Record) -> CoreResult<()> {
        self.store.add(record)
    }

    /// Replaces a stored record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent.
    pub fn update(&mut self, record: Record) -> CoreResult<()> {
        self.store.update(record)
    }

    /// Removes a record, and with `remove_children` its subtree.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent.
    pub fn remove(&mut self, record: &Record, remove_children: bool) -> CoreResult<Record> {
        self.store
            .remove(record.model_name(), &record.unique_id(), remove_children)
    }

    /// Counts records of one type, or all records.
    ///
    /// # Errors
    ///
    /// Returns store read errors.
    pub fn count(&self, model: Option<&str>) -> CoreResult<usize> {
        self.store.count(model)
    }

    /// Returns the stored record with these identifiers, creating and
    /// adding it with `attrs` if absent. The flag is `true` when created.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel`, `MissingIdentifier` or store errors.
    pub fn get_or_instantiate(
        &mut self,
        model: &str,
        ids: Attrs,
        attrs: Attrs,
    ) -> CoreResult<(Record, bool)> {
        let uid = self.registry.schema(model)?.unique_id(&ids)?;
        if let Some(existing) = self.find(model, &uid)? {
            return Ok((existing, false));
        }
        let record = self.instantiate(model, ids, attrs)?;
        self.add(record.clone())?;
        Ok((record, true))
    }

    /// Like [`Adapter::get_or_instantiate`], but applies `attrs` to an
    /// existing record too.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel`, `MissingIdentifier` or store errors.
    pub fn update_or_instantiate(
        &mut self,
        model: &str,
        ids: Attrs,
        attrs: Attrs,
    ) -> CoreResult<(Record, bool)> {
        let uid = self.registry.schema(model)?.unique_id(&ids)?;
        if let Some(mut existing) = self.find(model, &uid)? {
            existing.set_attrs(&attrs)?;
            self.update(existing.clone())?;
            return Ok((existing, false));
        }
        let record = self.instantiate(model, ids, attrs)?;
        self.add(record.clone())?;
        Ok((record, true))
    }

    /// Returns the stored record with the same ID as `record`, adding
    /// `record` if there is none. The flag is `true` when added.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn get_or_add_record(&mut self, record: Record) -> CoreResult<(Record, bool)> {
        if let Some(existing) = self.find(record.model_name(), &record.unique_id())? {
            return Ok((existing, false));
        }
        self.add(record.clone())?;
        Ok((record, true))
    }

    /// Stores `record`, replacing any record with the same ID. The flag is
    /// `true` when it was newly added.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn update_or_add_record(&mut self, record: Record) -> CoreResult<(Record, bool)> {
        if self
            .find(record.model_name(), &record.unique_id())?
            .is_some()
        {
            self.update(record.clone())?;
            return Ok((record, false));
        }
        self.add(record.clone())?;
        Ok((record, true))
    }

    /// Computes the diff that would make this adapter match `source`.
    ///
    /// # Errors
    ///
    /// See [`Differ::calculate`].
    pub fn diff_from(&self, source: &Adapter, options: &SyncOptions) -> CoreResult<Diff> {
        Differ::new(source, self, options).calculate()
    }

    /// Computes the diff that would make `target` match this adapter.
    ///
    /// # Errors
    ///
    /// See [`Differ::calculate`].
    pub fn diff_to(&self, target: &Adapter, options: &SyncOptions) -> CoreResult<Diff> {
        target.diff_from(self, options)
    }

    /// Diffs against `source` and applies the result to this adapter.
    ///
    /// # Errors
    ///
    /// See [`Differ::calculate`] and [`Syncer::apply`].
    pub fn sync_from(&mut self, source: &Adapter, options: &SyncOptions) -> CoreResult<SyncReport> {
        let diff = self.diff_from(source, options)?;
        self.sync_from_diff(source, diff, options)
    }

    /// Applies this adapter's state onto `target`.
    ///
    /// # Errors
    ///
    /// See [`Adapter::sync_from`].
    pub fn sync_to(&self, target: &mut Adapter, options: &SyncOptions) -> CoreResult<SyncReport> {
        target.sync_from(self, options)
    }

    /// Applies a previously computed diff from `source` to this adapter.
    ///
    /// # Errors
    ///
    /// See [`Syncer::apply`].
    pub fn sync_from_diff(
        &mut self,
        source: &Adapter,
        diff: Diff,
        options: &SyncOptions,
    ) -> CoreResult<SyncReport> {
        let mut syncer = Syncer::new(source, self, options);
        let changed = syncer.apply(&diff)?;
        let outcomes = syncer.into_outcomes();

        if changed {
            if let Some(hook) = self.sync_complete.clone() {
                hook(source, self, &diff, options.flags);
            }
        }
        Ok(SyncReport {
            diff,
            changed,
            outcomes,
        })
    }

    /// Serializes every stored record.
    ///
    /// # Errors
    ///
    /// Returns store read errors.
    pub fn dict(&self) -> CoreResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for model in self.store.model_names()? {
            let records = self
                .get_all(&model)?
                .into_iter()
                .map(|r| (r.unique_id(), r.to_fields()))
                .collect();
            snapshot.insert(model, records);
        }
        Ok(snapshot)
    }

    /// Renders [`Adapter::dict`] as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns store read errors or `Serialization`.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(&self.dict()?)
            .map_err(|e| CoreError::serialization(e.to_string()))
    }

    /// Adds every record of a snapshot to the store.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` for unregistered types, decoding errors, or
    /// `AlreadyExists` for conflicting records.
    pub fn load_snapshot(&mut self, snapshot: &Snapshot) -> CoreResult<()> {
        for (model, records) in snapshot {
            let schema = self.registry.schema(model)?;
            for fields in records.values() {
                self.add(Record::from_fields(schema, fields.clone())?)?;
            }
        }
        Ok(())
    }

    /// Renders the stored records as an indented tree starting from the
    /// top-level types.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for dangling child references.
    pub fn render(&self) -> CoreResult<String> {
        let mut out = self.to_string();
        for model in &self.top_level {
            out.push_str(&format!("\n  {model}"));
            for record in self.get_all(model)? {
                out.push('\n');
                self.render_record(&record, 4, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Renders one record and its resolved children.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for dangling child references.
    pub fn render_record(
        &self,
        record: &Record,
        indent: usize,
        out: &mut String,
    ) -> CoreResult<()> {
        let margin = " ".repeat(indent);
        out.push_str(&format!("{margin}{record}"));
        for (child_type, uids) in record.child_refs() {
            for child in self.get_by_uids(child_type, uids)? {
                out.push('\n');
                self.render_record(&child, indent + 2, out)?;
            }
        }
        Ok(())
    }

    /// Describes the declared type hierarchy, independent of stored records.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if a child type is not registered.
    pub fn tree_traversal(&self) -> CoreResult<String> {
        let mut out = self.kind.clone();
        for model in &self.top_level {
            self.traverse_type(model, 2, &mut out)?;
        }
        Ok(out)
    }

    fn traverse_type(&self, model: &str, indent: usize, out: &mut String) -> CoreResult<()> {
        out.push_str(&format!("\n{}{model}", " ".repeat(indent)));
        for (child_type, _) in self.registry.schema(model)?.children {
            self.traverse_type(child_type, indent + 2, out)?;
        }
        Ok(())
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == self.name {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} \"{}\"", self.kind, self.name)
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("top_level", &self.top_level)
            .finish_non_exhaustive()
    }
}
