//! # treesync Core
//!
//! Diff and sync engine for hierarchical typed records.
//!
//! Two [`Adapter`]s each own a [`RecordStore`] holding typed [`Record`]s
//! organised as trees (a site owns devices, a device owns interfaces).
//! The [`Differ`] compares a source adapter with a destination adapter and
//! produces a [`Diff`]; the [`Syncer`] applies that diff to the destination
//! through per-type create/update/delete hooks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐        ┌──────────────┐
//! │ Adapter (src)│        │ Adapter (dst)│
//! │  RecordStore │        │  RecordStore │
//! └──────┬───────┘        └──────┬───────┘
//!        └──────── Differ ───────┘
//!                    │
//!                  Diff ──── Syncer ───▶ dst hooks + store
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use treesync_core::{attrs, Adapter, ModelRegistry, ModelSchema, ModelType, SyncOptions};
//!
//! static SITE: ModelSchema = ModelSchema::new("site", &["name"]).with_attributes(&["region"]);
//!
//! let registry = Arc::new(ModelRegistry::new().register(ModelType::new(&SITE)).unwrap());
//! let mut source = Adapter::new("inventory", "source", ["site"], Arc::clone(&registry)).unwrap();
//! let mut dest = Adapter::new("inventory", "dest", ["site"], registry).unwrap();
//!
//! let nyc = source
//!     .instantiate("site", attrs! { "name" => "nyc" }, attrs! { "region" => "us-east" })
//!     .unwrap();
//! source.add(nyc).unwrap();
//!
//! let report = dest.sync_from(&source, &SyncOptions::default()).unwrap();
//! assert!(report.changed);
//! assert_eq!(dest.count(Some("site")).unwrap(), 1);
//! assert!(!dest.diff_from(&source, &SyncOptions::default()).unwrap().has_diffs());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
mod crud;
mod diff;
mod differ;
mod error;
mod flags;
pub mod logging;
mod record;
mod registry;
mod schema;
mod status;
mod store;
mod syncer;
mod value;

pub use adapter::{Adapter, Loader, Snapshot, SyncCompleteHook};
pub use config::{ChildOrdering, ElementComparator, ProgressCallback, SyncOptions};
pub use crud::{CreateFn, Creator, CrudContext, DefaultHooks, DeleteFn, Deleter, UpdateFn, Updater};
pub use diff::{AttrsDiff, Diff, DiffAction, DiffElement, DiffSummary};
pub use differ::Differ;
pub use error::{CoreError, CoreResult, CrudError, CrudResult};
pub use flags::{ModelFlags, SyncFlags};
pub use logging::enable_console_logging;
pub use record::Record;
pub use registry::{ModelRegistry, ModelType};
pub use schema::{ModelSchema, UID_SEPARATOR};
pub use status::{RecordStatus, SyncStatus};
pub use store::{KvStore, LocalStore, RecordStore, DEFAULT_KEY_PREFIX};
pub use syncer::{SyncOutcome, SyncReport, Syncer};
pub use value::{attrs_to_json, Attrs, Value};
