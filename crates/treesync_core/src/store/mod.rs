//! Record store trait and implementations.
//!
//! A store is a keyed container of records per type. Adapters own exactly
//! one store; the differ reads from it and the syncer mutates it.

mod kv;
mod local;

pub use kv::{KvStore, DEFAULT_KEY_PREFIX};
pub use local::LocalStore;

use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::ModelSchema;

/// A keyed container of records, one keyspace per record type.
///
/// # Invariants
///
/// - At most one record per `(type, unique ID)`
/// - `add` fails with `AlreadyExists` for a distinct record under a taken ID
/// - `update` and `remove` fail with `NotFound` when the record is absent
/// - Stored records carry the label of the owning adapter
pub trait RecordStore: Send + Sync {
    /// Binds the store to its adapter label and the record types it may hold.
    fn attach(&mut self, adapter: &str, schemas: &[&'static ModelSchema]);

    /// Returns the names of types that currently have records.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn model_names(&self) -> CoreResult<Vec<String>>;

    /// Returns the record of type `model` with unique ID `uid`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn get(&self, model: &str, uid: &str) -> CoreResult<Option<Record>>;

    /// Returns every record of type `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn get_all(&self, model: &str) -> CoreResult<Vec<Record>>;

    /// Returns the records with the given unique IDs, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the first missing ID.
    fn get_by_uids(&self, model: &str, uids: &[String]) -> CoreResult<Vec<Record>> {
        uids.iter()
            .map(|uid| {
                self.get(model, uid)?
                    .ok_or_else(|| CoreError::not_found(model, uid.as_str()))
            })
            .collect()
    }

    /// Adds a record.
    ///
    /// Adding a record equal to the one already stored is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a different record has the same ID.
    fn add(&mut self, record: Record) -> CoreResult<()>;

    /// Replaces a stored record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has the same ID.
    fn update(&mut self, record: Record) -> CoreResult<()>;

    /// Removes and returns a record without touching its children.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn take(&mut self, model: &str, uid: &str) -> CoreResult<Option<Record>>;

    /// Removes a record, and with `remove_children` its whole subtree.
    ///
    /// Children that are already gone are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record itself is absent.
    fn remove(&mut self, model: &str, uid: &str, remove_children: bool) -> CoreResult<Record> {
        let mut record = self
            .take(model, uid)?
            .ok_or_else(|| CoreError::not_found(model, uid))?;
        record.set_adapter(None);

        if remove_children {
            for (child_type, child_uids) in record.child_refs() {
                for child_uid in child_uids {
                    match self.remove(child_type, child_uid, true) {
                        Ok(_) => {}
                        Err(CoreError::NotFound { .. }) => {
                            tracing::error!(
                                parent_type = model,
                                parent_id = uid,
                                child_type,
                                child_id = %child_uid,
                                "unable to remove child record: not found"
                            );
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(record)
    }

    /// Counts records of `model`, or of every type when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn count(&self, model: Option<&str>) -> CoreResult<usize>;
}
