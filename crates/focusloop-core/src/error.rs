//! Core error types for focusloop-core.
//!
//! Store, validation and configuration failures each get their own
//! thiserror enum; `CoreError` wraps them for callers that just want `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence port errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised by a persistence port implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to open the backing store
    #[error("Failed to open store at {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Store migration failed: {0}")]
    MigrationFailed(String),

    /// The backing store is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// The backend could not be reached at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not locate the data directory
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),
}

/// Validation errors. Always raised before any store call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was blank
    #[error("'{field}' must not be empty")]
    Empty { field: &'static str },

    /// A numeric field was outside its allowed range
    #[error("'{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A duration was zero
    #[error("'{field}' must be a positive number of minutes")]
    NonPositiveDuration { field: &'static str },

    /// The referenced record does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_wraps_into_core_error() {
        let err: CoreError = StoreError::Locked.into();
        assert!(matches!(err, CoreError::Store(StoreError::Locked)));
        assert_eq!(err.to_string(), "Store error: Store is locked");
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::OutOfRange {
            field: "estimated_pomodoros",
            value: 11,
            min: 1,
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "'estimated_pomodoros' must be between 1 and 10, got 11"
        );
    }

    #[test]
    fn rusqlite_errors_map_to_query_failed() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
