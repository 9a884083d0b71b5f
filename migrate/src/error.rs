//! Error types for document migration.

use jsonshift_core::UnsupportedSchemaFeature;
use thiserror::Error;

/// Errors that can occur while migrating a document.
///
/// All variants are fatal to the single `migrate` call: there is no partial
/// application or rollback, and the destination copy from a failed call is
/// discarded. These are schema/document mismatches, not transient
/// conditions, so retrying without correcting the rule table or the input
/// is not meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A delta requires customization but the rule table has no entry for
    /// its field path. This is a contract violation by the caller, caught
    /// before any delta is applied.
    #[error("no update rule registered for field path '{field_path}'")]
    MissingRule { field_path: String },

    /// A fan-out segment of a delta path did not resolve to a field.
    #[error("cannot navigate to array at '{path}' in the document")]
    ArrayNotFound { path: String },

    /// A fan-out segment resolved to something other than an array.
    #[error("expected an array at '{path}' in the document")]
    NotAnArray { path: String },

    /// The parent of a leaf field could not be located.
    #[error("cannot navigate to field '{path}' in the document")]
    FieldNotFound { path: String },

    /// A schema failed to parse while checking rule completeness.
    #[error(transparent)]
    Schema(#[from] UnsupportedSchemaFeature),
}

/// Convenience alias for results with [`MigrationError`].
pub type Result<T> = std::result::Result<T, MigrationError>;
