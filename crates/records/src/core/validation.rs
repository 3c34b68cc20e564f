//! Validation gateway.
//!
//! Payload schemas live outside this crate. The services call a
//! [`ValidationGateway`] before every write and store the value it returns,
//! so a gateway may normalize payloads (fill defaults, coerce types) as well
//! as reject them.

use serde_json::Value;

use crate::error::{ValidationDetail, ValidationError};

/// Result of validating a payload or metadata document.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Accepted; carries the value to store.
    Valid(Value),
    /// Rejected with one or more problems.
    Invalid(Vec<ValidationDetail>),
}

impl ValidationOutcome {
    /// Returns `true` if the document was accepted.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }
}

/// Validates record payloads and metadata.
///
/// Implementations must be synchronous and free of side effects.
pub trait ValidationGateway: Send + Sync {
    /// Validates `data` against the schema registered for `record_type`.
    fn validate_by_type(&self, record_type: &str, data: &Value) -> ValidationOutcome;

    /// Validates record metadata.
    fn validate_metadata(&self, metadata: &Value) -> ValidationOutcome;
}

/// A gateway that accepts every document unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveValidator;

impl ValidationGateway for PermissiveValidator {
    fn validate_by_type(&self, _record_type: &str, data: &Value) -> ValidationOutcome {
        ValidationOutcome::Valid(data.clone())
    }

    fn validate_metadata(&self, metadata: &Value) -> ValidationOutcome {
        ValidationOutcome::Valid(metadata.clone())
    }
}

/// Validates a payload, returning the value to store.
pub(crate) fn check_payload(
    gateway: &dyn ValidationGateway,
    record_type: &str,
    data: &Value,
) -> Result<Value, ValidationError> {
    match gateway.validate_by_type(record_type, data) {
        ValidationOutcome::Valid(value) => Ok(value),
        ValidationOutcome::Invalid(details) => Err(ValidationError::InvalidRecord {
            record_type: record_type.to_string(),
            details,
        }),
    }
}

/// Validates metadata, returning the value to store.
pub(crate) fn check_metadata(
    gateway: &dyn ValidationGateway,
    metadata: &Value,
) -> Result<Value, ValidationError> {
    match gateway.validate_metadata(metadata) {
        ValidationOutcome::Valid(value) => Ok(value),
        ValidationOutcome::Invalid(details) => Err(ValidationError::InvalidMetadata { details }),
    }
}
