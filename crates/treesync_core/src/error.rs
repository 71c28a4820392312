//! Error types for treesync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type returned by create/update/delete hooks.
pub type CrudResult<T> = Result<T, CrudError>;

/// A create/update/delete operation failed against the real backend.
///
/// These are the only errors the syncer may continue past, and only when
/// [`SyncFlags::CONTINUE_ON_FAILURE`](crate::SyncFlags::CONTINUE_ON_FAILURE)
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrudError {
    /// The record could not be created.
    #[error("not created: {0}")]
    NotCreated(String),

    /// The record could not be updated.
    #[error("not updated: {0}")]
    NotUpdated(String),

    /// The record could not be deleted.
    #[error("not deleted: {0}")]
    NotDeleted(String),
}

impl CrudError {
    /// Returns the message without the operation prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotCreated(msg) | Self::NotUpdated(msg) | Self::NotDeleted(msg) => msg,
        }
    }
}

/// Errors that can occur in treesync core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record hook failed.
    #[error(transparent)]
    Crud(#[from] CrudError),

    /// A distinct record with the same unique ID is already stored.
    #[error("{model} '{unique_id}' already exists")]
    AlreadyExists {
        /// Record type name.
        model: String,
        /// Unique ID of the conflicting record.
        unique_id: String,
    },

    /// The record is not present.
    #[error("{model} '{unique_id}' not found")]
    NotFound {
        /// Record type name.
        model: String,
        /// Unique ID that was looked up.
        unique_id: String,
    },

    /// A child of an undeclared type was attached to or detached from a record.
    #[error("{parent} does not have children of type '{child}'")]
    WrongType {
        /// Parent record type name.
        parent: String,
        /// Offending child type name.
        child: String,
    },

    /// Two records matched on unique ID but have different types.
    #[error("type mismatch: {source_model} vs {dest_model}")]
    TypeMismatch {
        /// Type of the source record.
        source_model: String,
        /// Type of the destination record.
        dest_model: String,
    },

    /// Two records matched on unique ID but have different shortnames.
    #[error("shortname mismatch: {source_name} vs {dest_name}")]
    ShortnameMismatch {
        /// Shortname of the source record.
        source_name: String,
        /// Shortname of the destination record.
        dest_name: String,
    },

    /// Two records matched on unique ID but have different identifiers.
    #[error("keys mismatch: {source_keys} vs {dest_keys}")]
    IdentifierMismatch {
        /// Rendered identifiers of the source record.
        source_keys: String,
        /// Rendered identifiers of the destination record.
        dest_keys: String,
    },

    /// A record type declaration is inconsistent.
    #[error("invalid schema for {model}: {message}")]
    InvalidSchema {
        /// Record type name.
        model: String,
        /// What is wrong with the declaration.
        message: String,
    },

    /// No record type with this name is registered.
    #[error("unknown model: {name}")]
    UnknownModel {
        /// Requested type name.
        name: String,
    },

    /// A record is missing one of its identifier values.
    #[error("{model} is missing identifier '{field}'")]
    MissingIdentifier {
        /// Record type name.
        model: String,
        /// The absent identifier field.
        field: String,
    },

    /// Key/value backend error.
    #[error("storage error: {0}")]
    Storage(#[from] treesync_storage::StorageError),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an already-exists error.
    pub fn already_exists(model: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            model: model.into(),
            unique_id: unique_id.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(model: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self::NotFound {
            model: model.into(),
            unique_id: unique_id.into(),
        }
    }

    /// Creates a wrong-type error.
    pub fn wrong_type(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::WrongType {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Creates an invalid-schema error.
    pub fn invalid_schema(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown-model error.
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns `true` for hook failures.
    #[must_use]
    pub fn is_crud(&self) -> bool {
        matches!(self, Self::Crud(_))
    }

    /// Returns `true` for store bookkeeping violations.
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists { .. } | Self::NotFound { .. } | Self::WrongType { .. }
        )
    }

    /// Returns `true` for identity disagreements found while diffing.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::ShortnameMismatch { .. }
                | Self::IdentifierMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::not_found("device", "nyc-spine1");
        assert_eq!(err.to_string(), "device 'nyc-spine1' not found");

        let err = CoreError::wrong_type("site", "person");
        assert_eq!(err.to_string(), "site does not have children of type 'person'");

        let err = CoreError::ShortnameMismatch {
            source_name: "eth0".into(),
            dest_name: "eth1".into(),
        };
        assert_eq!(err.to_string(), "shortname mismatch: eth0 vs eth1");
    }

    #[test]
    fn crud_error_is_transparent() {
        let err: CoreError = CrudError::NotCreated("backend refused".into()).into();
        assert_eq!(err.to_string(), "not created: backend refused");
        assert!(err.is_crud());
        assert!(!err.is_store());
    }

    #[test]
    fn classification() {
        assert!(CoreError::already_exists("site", "nyc").is_store());
        assert!(CoreError::TypeMismatch {
            source_model: "site".into(),
            dest_model: "device".into()
        }
        .is_validation());
        assert!(!CoreError::unknown_model("x").is_validation());
    }

    #[test]
    fn crud_message() {
        assert_eq!(CrudError::NotDeleted("gone".into()).message(), "gone");
    }
}
