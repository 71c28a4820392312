//! Record store persisted in a key/value backend.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use treesync_storage::KvBackend;

use super::RecordStore;
use crate::error::{CoreError, CoreResult};
use crate::flags::ModelFlags;
use crate::record::Record;
use crate::schema::ModelSchema;
use crate::value::Attrs;

/// Key prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "treesync";

/// Encoded form of a stored record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    model: String,
    fields: Attrs,
    flags: u8,
}

/// A record store backed by a [`KvBackend`].
///
/// Each record is CBOR-encoded under `"{prefix}:{store_id}:{type}:{uid}"`.
/// The store ID defaults to a random UUID so that several stores can share
/// one backend. Writes are last-write-wins at the backend.
pub struct KvStore<B: KvBackend> {
    backend: B,
    prefix: String,
    store_id: String,
    label: String,
    schemas: HashMap<&'static str, &'static ModelSchema>,
}

impl<B: KvBackend> KvStore<B> {
    /// Creates a store with a random store ID.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            store_id: uuid::Uuid::new_v4().to_string(),
            label: String::new(),
            schemas: HashMap::new(),
        }
    }

    /// Uses a fixed store ID, e.g. to reopen a previous store.
    #[must_use]
    pub fn with_store_id(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = store_id.into();
        self
    }

    /// Uses a custom key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the store ID.
    #[must_use]
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn store_prefix(&self) -> String {
        format!("{}:{}:", self.prefix, self.store_id)
    }

    fn model_prefix(&self, model: &str) -> String {
        format!("{}{model}:", self.store_prefix())
    }

    fn key(&self, model: &str, uid: &str) -> String {
        format!("{}{uid}", self.model_prefix(model))
    }

    fn encode(record: &Record) -> CoreResult<Vec<u8>> {
        let stored = StoredRecord {
            model: record.model_name().to_string(),
            fields: record.to_fields(),
            flags: record.flags().bits(),
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&stored, &mut buf)
            .map_err(|e| CoreError::serialization(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> CoreResult<Record> {
        let stored: StoredRecord =
            ciborium::from_reader(bytes).map_err(|e| CoreError::serialization(e.to_string()))?;
        let schema = self
            .schemas
            .get(stored.model.as_str())
            .copied()
            .ok_or_else(|| CoreError::unknown_model(stored.model.as_str()))?;
        let mut record = Record::from_fields(schema, stored.fields)?;
        record.set_flags(ModelFlags::from_bits(stored.flags));
        record.set_adapter(Some(self.label.clone()));
        Ok(record)
    }

    fn write(&self, record: &Record) -> CoreResult<()> {
        let key = self.key(record.model_name(), &record.unique_id());
        self.backend.set(&key, &Self::encode(record)?)?;
        Ok(())
    }
}

impl<B: KvBackend> RecordStore for KvStore<B> {
    fn attach(&mut self, adapter: &str, schemas: &[&'static ModelSchema]) {
        self.label = adapter.to_string();
        self.schemas = schemas.iter().map(|s| (s.name, *s)).collect();
    }

    fn model_names(&self) -> CoreResult<Vec<String>> {
        let prefix = self.store_prefix();
        let names: BTreeSet<String> = self
            .backend
            .scan_prefix(&prefix)?
            .iter()
            .filter_map(|key| {
                key.strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.split(':').next())
                    .map(str::to_string)
            })
            .collect();
        Ok(names.into_iter().collect())
    }

    fn get(&self, model: &str, uid: &str) -> CoreResult<Option<Record>> {
        match self.backend.get(&self.key(model, uid))? {
            Some(bytes) => self.decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn get_all(&self, model: &str) -> CoreResult<Vec<Record>> {
        let mut records = Vec::new();
        for key in self.backend.scan_prefix(&self.model_prefix(model))? {
            if let Some(bytes) = self.backend.get(&key)? {
                records.push(self.decode(&bytes)?);
            }
        }
        Ok(records)
    }

    fn add(&mut self, record: Record) -> CoreResult<()> {
        let uid = record.unique_id();
        if let Some(existing) = self.get(record.model_name(), &uid)? {
            if existing.same_content(&record) {
                return Ok(());
            }
            return Err(CoreError::already_exists(record.model_name(), uid));
        }
        self.write(&record)
    }

    fn update(&mut self, record: Record) -> CoreResult<()> {
        let uid = record.unique_id();
        if !self.backend.exists(&self.key(record.model_name(), &uid))? {
            return Err(CoreError::not_found(record.model_name(), uid));
        }
        self.write(&record)
    }

    fn take(&mut self, model: &str, uid: &str) -> CoreResult<Option<Record>> {
        let Some(record) = self.get(model, uid)? else {
            return Ok(None);
        };
        self.backend.delete(&self.key(model, uid))?;
        Ok(Some(record))
    }

    fn count(&self, model: Option<&str>) -> CoreResult<usize> {
        let prefix = match model {
            Some(name) => self.model_prefix(name),
            None => self.store_prefix(),
        };
        Ok(self.backend.scan_prefix(&prefix)?.len())
    }
}
