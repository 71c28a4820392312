//! Per-record sync outcome tracking.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of the last create/update/delete applied to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// The operation completed.
    Success,
    /// The hook declined to return a record; children were not processed.
    Failure,
    /// The hook raised a CRUD error.
    Error,
    /// No operation has been attempted yet.
    #[default]
    Unknown,
}

impl SyncStatus {
    /// Returns the lowercase name used in logs and serialized output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`SyncStatus`] plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordStatus {
    /// The outcome.
    pub status: SyncStatus,
    /// Details about the outcome.
    pub message: String,
}

impl RecordStatus {
    /// Creates a status with a message.
    pub fn new(status: SyncStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}
