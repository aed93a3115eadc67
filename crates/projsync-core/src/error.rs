//! Error types for projsync-core

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type alias using projsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that fail a whole sync call
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table identifier outside the supported set
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Structurally invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced entity not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether the caller sent something the engine refuses to process.
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::UnknownTable(_) | Self::InvalidRequest(_))
    }

    /// Whether the underlying store is unavailable (as opposed to rejecting one row).
    pub fn is_storage_outage(&self) -> bool {
        match self {
            Self::Database(error) => is_storage_outage(error),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Classify a `rusqlite` error as a storage outage.
///
/// Constraint violations, type mismatches and similar failures concern a single row and are
/// recovered per record. Busy/locked databases, I/O failures and corrupt files mean no further
/// record can succeed, so they abort the call.
pub fn is_storage_outage(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::OutOfMemory
                | ErrorCode::FileLockingProtocolFailed
        ),
        rusqlite::Error::InvalidPath(_) => true,
        _ => false,
    }
}

/// Record-level decode failure. Counted as `failed`, never aborts a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required field is absent or null
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A field holds a value of the wrong type
    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}
