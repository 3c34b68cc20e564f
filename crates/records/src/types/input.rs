//! Write inputs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input for creating a record.
///
/// ```
/// use helios_records::types::CreateRecord;
/// use serde_json::json;
///
/// let input = CreateRecord::new("invoice", json!({"amount": 100}))
///     .with_id("inv-1")
///     .with_metadata(json!({"source": "import"}));
///
/// assert_eq!(input.id.as_deref(), Some("inv-1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecord {
    /// Caller-chosen id. A UUIDv4 is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Type tag; must be non-empty.
    #[serde(rename = "type", default)]
    pub record_type: String,

    /// The payload; required.
    #[serde(default)]
    pub data: Option<Value>,

    /// Optional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CreateRecord {
    /// Creates an input with the given type and payload.
    pub fn new(record_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: None,
            record_type: record_type.into(),
            data: Some(data),
            metadata: None,
        }
    }

    /// Sets the record id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A partial update. Absent fields keep their existing value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    /// New type tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    /// New payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// New metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RecordPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the payload.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Changes the type tag.
    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Replaces the metadata.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.record_type.is_none() && self.data.is_none() && self.metadata.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_from_json() {
        let input: CreateRecord =
            serde_json::from_value(json!({"type": "invoice", "data": {"amount": 1}})).unwrap();
        assert_eq!(input.record_type, "invoice");
        assert!(input.id.is_none());
        assert_eq!(input.data, Some(json!({"amount": 1})));
    }

    #[test]
    fn test_create_missing_data_deserializes() {
        let input: CreateRecord = serde_json::from_value(json!({"type": "invoice"})).unwrap();
        assert!(input.data.is_none());
    }

    #[test]
    fn test_patch_builder() {
        assert!(RecordPatch::new().is_empty());

        let patch = RecordPatch::new()
            .data(json!({"amount": 2}))
            .record_type("credit-note");
        assert!(!patch.is_empty());
        assert_eq!(patch.record_type.as_deref(), Some("credit-note"));
        assert!(patch.metadata.is_none());
    }
}
