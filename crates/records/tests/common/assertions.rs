//! Assertion helpers for records and errors.

use helios_records::error::{ErrorKind, StorageError};
use helios_records::types::Record;

/// Asserts that a record is active at the expected version.
pub fn assert_active_at(record: &Record, expected_version: u64) {
    assert!(
        record.is_active(),
        "Expected record {} to be active, but it was deleted",
        record.id
    );
    assert_eq!(
        record.version, expected_version,
        "Version mismatch for {}: expected {}, got {}",
        record.id, expected_version, record.version
    );
}

/// Asserts that a result failed with the given error kind.
pub fn assert_kind<T: std::fmt::Debug>(result: Result<T, StorageError>, expected: ErrorKind) {
    match result {
        Ok(value) => panic!("Expected {} error, got Ok({:?})", expected, value),
        Err(err) => assert_eq!(
            err.kind(),
            expected,
            "Expected {} error, got {:?}",
            expected,
            err
        ),
    }
}

/// Asserts that a result is a version conflict reporting `current_version`.
pub fn assert_conflict_at<T: std::fmt::Debug>(result: Result<T, StorageError>, current_version: u64) {
    match result {
        Ok(value) => panic!("Expected version conflict, got Ok({:?})", value),
        Err(err) => {
            assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict, "got {:?}", err);
            assert_eq!(err.current_version(), Some(current_version));
        }
    }
}
