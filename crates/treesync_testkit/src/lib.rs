//! # treesync Testkit
//!
//! Test utilities for treesync.
//!
//! This crate provides:
//! - A network inventory fixture domain (`site` → `device` → `interface`)
//! - Hooks that record calls and fail on demand
//! - Property-based generators for random inventories
//! - A harness for diff/sync round trips between two adapters
//!
//! ## Usage
//!
//! ```rust
//! use treesync_testkit::prelude::*;
//!
//! let mut harness = SyncHarness::new(source_inventory(), dest_inventory());
//! harness.sync(SyncFlags::NONE);
//! harness.assert_converged();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use treesync_core::{
        attrs, Adapter, CoreError, CrudError, Diff, DiffAction, DiffElement, ModelFlags,
        Record, SyncFlags, SyncOptions, SyncStatus, Value,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
