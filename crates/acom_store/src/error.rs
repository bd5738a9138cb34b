//! Error types for the entity store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in entity store operations.
///
/// The first four variants are the classified failures callers are expected
/// to map onto their own surface (HTTP status codes and the like). The fatal
/// variants signal programmer errors; see [`StoreError::is_fatal`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Payload failed schema validation.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the validation failure.
        message: String,
    },

    /// An entity with this primary value already exists.
    #[error("{entity_type} {primary} already exists")]
    AlreadyExists {
        /// Entity type.
        entity_type: String,
        /// Display form of the primary value.
        primary: String,
    },

    /// A lookup expecting one entity found none.
    #[error("{entity_type}/{key}={value} does not exist")]
    DoesNotExist {
        /// Entity type.
        entity_type: String,
        /// Attribute key searched.
        key: String,
        /// Display form of the searched value.
        value: String,
    },

    /// A lookup expecting one entity found several.
    #[error("{entity_type}/{key}={value} is ambiguous: {count} matches")]
    Ambiguous {
        /// Entity type.
        entity_type: String,
        /// Attribute key searched.
        key: String,
        /// Display form of the searched value.
        value: String,
        /// Number of matching entities.
        count: usize,
    },

    /// Edit tried to change the primary value.
    #[error("renames are not supported ({from} -> {to}), delete and re-add")]
    RenameNotSupported {
        /// Current primary value.
        from: String,
        /// Requested primary value.
        to: String,
    },

    /// A caller supplied a field that must never arrive from outside.
    #[error("forbidden field supplied: {field}")]
    ForbiddenField {
        /// Field name.
        field: String,
    },

    /// Operation is only available in test mode.
    #[error("{operation} is only supported in test mode")]
    TestModeRequired {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// Backing database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] acom_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a test-mode-required error.
    pub fn test_mode_required(operation: &'static str) -> Self {
        Self::TestModeRequired { operation }
    }

    /// Whether this error reports a programmer error rather than bad input
    /// or missing data.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RenameNotSupported { .. }
                | Self::ForbiddenField { .. }
                | Self::TestModeRequired { .. }
        )
    }

    /// Whether this is a `DoesNotExist` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DoesNotExist { .. })
    }
}
