//! # treesync Storage
//!
//! Key/value backend trait and implementations for treesync.
//!
//! Backends are **opaque byte stores** addressed by string keys. They do
//! not interpret the values they hold; record encoding and key layout are
//! owned by `treesync_core`.
//!
//! ## Design Principles
//!
//! - Backends are simple key/value stores (get, set, delete, scan)
//! - No knowledge of records, schemas or diffs
//! - Must be `Send + Sync` so one backend can be shared by several stores
//! - Writes are "last write wins"; there is no compare-and-swap
//!
//! ## Available Backends
//!
//! - [`InMemoryKv`] - For testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use treesync_storage::{KvBackend, InMemoryKv};
//!
//! let backend = InMemoryKv::new();
//! backend.set("site:nyc", b"payload").unwrap();
//! assert_eq!(backend.get("site:nyc").unwrap().as_deref(), Some(&b"payload"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;

pub use backend::KvBackend;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryKv;
