//! Error types for the record store.
//!
//! Errors are grouped by category (record state, concurrency, validation,
//! filtering, transactions, backend) and folded into a single
//! [`StorageError`]. Callers that only care about the coarse outcome use
//! [`StorageError::kind`], which maps every error onto the five-way taxonomy
//! exposed to transport layers.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all record store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record state errors
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Concurrency and versioning errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Payload and metadata validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Filter translation errors
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum RecordError {
    /// No active record with the given id exists.
    #[error("record not found: {id}")]
    NotFound { id: String },

    /// Recovery was requested for a record that is not deleted.
    #[error("record is not deleted: {id}")]
    NotDeleted { id: String },

    /// The requested archived version does not exist.
    #[error("version not found: {id}/versions/{version}")]
    VersionNotFound { id: String, version: u64 },

    /// A record with the given id already exists.
    #[error("record already exists: {id}")]
    AlreadyExists { id: String },

    /// An active record with the given id already exists.
    #[error("an active record already exists for {id}")]
    AlreadyActive { id: String },
}

/// Errors related to optimistic concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The caller's expected version does not match the stored version.
    #[error("version conflict on {id}: expected {expected_version}, found {actual_version}")]
    VersionConflict {
        id: String,
        expected_version: u64,
        actual_version: u64,
    },
}

/// Errors raised when a payload or its metadata is rejected.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The record payload failed validation for its type.
    #[error("invalid {record_type} payload: {}", summarize(.details))]
    InvalidRecord {
        record_type: String,
        details: Vec<ValidationDetail>,
    },

    /// The record metadata failed validation.
    #[error("invalid metadata: {}", summarize(.details))]
    InvalidMetadata { details: Vec<ValidationDetail> },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },
}

impl ValidationError {
    /// Returns the individual validation problems, if any.
    pub fn details(&self) -> &[ValidationDetail] {
        match self {
            ValidationError::InvalidRecord { details, .. }
            | ValidationError::InvalidMetadata { details } => details,
            ValidationError::MissingRequiredField { .. } => &[],
        }
    }
}

fn summarize(details: &[ValidationDetail]) -> String {
    match details {
        [] => "rejected".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// A single validation problem reported by the validation gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetail {
    /// Path to the offending field (e.g. `lines[0].amount`).
    pub path: String,
    /// A human-readable error message.
    pub message: String,
}

impl ValidationDetail {
    /// Creates a new validation detail.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors raised while translating a filter into a predicate tree.
#[derive(Error, Debug)]
pub enum FilterError {
    /// The field name is not a known column or a well-formed payload path.
    #[error("invalid filter field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// The operator is not one of the supported operators.
    #[error("unsupported filter operator '{operator}'")]
    UnsupportedOperator { operator: String },

    /// The value does not have the shape the operator requires.
    #[error("invalid value for '{field}' with operator {operator}: {message}")]
    InvalidValue {
        field: String,
        operator: String,
        message: String,
    },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },

    /// Transaction is no longer valid (already committed or rolled back).
    #[error("transaction no longer valid")]
    InvalidTransaction,
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Payload, metadata or filter input was rejected; nothing was written.
    ValidationFailure,
    /// The record (or version) is missing or in the wrong state.
    NotFound,
    /// The caller's expected version is stale.
    ConcurrencyConflict,
    /// The operation collides with an existing record.
    Conflict,
    /// Opaque backend failure.
    StorageFailure,
}

impl ErrorKind {
    /// Returns the HTTP status code a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::ValidationFailure => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::ConcurrencyConflict | ErrorKind::Conflict => 409,
            ErrorKind::StorageFailure => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ValidationFailure => "validation-failure",
            ErrorKind::NotFound => "not-found",
            ErrorKind::ConcurrencyConflict => "concurrency-conflict",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StorageFailure => "storage-failure",
        };
        write!(f, "{}", name)
    }
}

impl StorageError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Record(RecordError::NotFound { .. })
            | StorageError::Record(RecordError::NotDeleted { .. })
            | StorageError::Record(RecordError::VersionNotFound { .. }) => ErrorKind::NotFound,
            StorageError::Record(RecordError::AlreadyExists { .. })
            | StorageError::Record(RecordError::AlreadyActive { .. }) => ErrorKind::Conflict,
            StorageError::Concurrency(_) => ErrorKind::ConcurrencyConflict,
            StorageError::Validation(_) | StorageError::Filter(_) => ErrorKind::ValidationFailure,
            StorageError::Transaction(_) | StorageError::Backend(_) => ErrorKind::StorageFailure,
        }
    }

    /// Returns `true` if the error reports a missing record or version.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns the stored version reported by a version conflict.
    pub fn current_version(&self) -> Option<u64> {
        match self {
            StorageError::Concurrency(ConcurrencyError::VersionConflict {
                actual_version, ..
            }) => Some(*actual_version),
            _ => None,
        }
    }
}

/// Result type alias for record store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for filter translation.
pub type FilterResult<T> = Result<T, FilterError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::Record(RecordError::NotFound {
            id: "rec-1".to_string(),
        });
        assert_eq!(err.to_string(), "record not found: rec-1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().http_status(), 404);
    }

    #[test]
    fn test_version_conflict_reports_current_version() {
        let err: StorageError = ConcurrencyError::VersionConflict {
            id: "rec-1".to_string(),
            expected_version: 2,
            actual_version: 3,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "version conflict on rec-1: expected 2, found 3"
        );
        assert_eq!(err.current_version(), Some(3));
        assert_eq!(err.kind().http_status(), 409);
    }

    #[test]
    fn test_validation_summary() {
        let err = ValidationError::InvalidRecord {
            record_type: "invoice".to_string(),
            details: vec![
                ValidationDetail::new("amount", "must be positive"),
                ValidationDetail::new("currency", "is required"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid invoice payload: amount: must be positive (and 1 more)"
        );
        assert_eq!(err.details().len(), 2);
    }

    #[test]
    fn test_error_kinds() {
        let cases: Vec<(StorageError, ErrorKind)> = vec![
            (
                RecordError::NotDeleted { id: "a".into() }.into(),
                ErrorKind::NotFound,
            ),
            (
                RecordError::VersionNotFound {
                    id: "a".into(),
                    version: 9,
                }
                .into(),
                ErrorKind::NotFound,
            ),
            (
                RecordError::AlreadyActive { id: "a".into() }.into(),
                ErrorKind::Conflict,
            ),
            (
                FilterError::UnsupportedOperator {
                    operator: "like".into(),
                }
                .into(),
                ErrorKind::ValidationFailure,
            ),
            (
                TransactionError::InvalidTransaction.into(),
                ErrorKind::StorageFailure,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "unexpected kind for {err}");
        }
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::ConcurrencyConflict.to_string(), "concurrency-conflict");
        assert_eq!(ErrorKind::StorageFailure.http_status(), 500);
        assert_eq!(ErrorKind::ValidationFailure.http_status(), 400);
    }
}
