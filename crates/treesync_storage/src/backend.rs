//! Key/value backend trait definition.

use std::sync::Arc;

use crate::error::StorageResult;

/// A low-level key/value backend.
///
/// Backends are **opaque byte stores**. Values are whatever the caller
/// wrote; the backend never decodes them.
///
/// # Invariants
///
/// - `get` returns exactly the bytes last written under that key
/// - `set` overwrites any previous value (last write wins)
/// - `scan_prefix` returns keys in ascending byte order
/// - Backends must be `Send + Sync` for shared access
///
/// # Implementors
///
/// - [`super::InMemoryKv`] - For testing
pub trait KvBackend: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is rejected or the write fails.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Deletes `key`. Returns `true` if a value was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Returns `true` if a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns every key starting with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

impl<B: KvBackend + ?Sized> KvBackend for Arc<B> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        (**self).exists(key)
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).scan_prefix(prefix)
    }
}
