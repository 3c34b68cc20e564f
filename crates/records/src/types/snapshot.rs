//! Archived version snapshots and history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::Record;

/// An immutable archived copy of a record as of a past version.
///
/// Snapshots are keyed by `(record_id, version)` and are never modified after
/// insertion. Soft-deleting a record never removes its snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    /// The record this snapshot belongs to.
    pub record_id: String,

    /// The record's version at archive time.
    pub version: u64,

    /// The record type at archive time.
    #[serde(rename = "type")]
    pub record_type: String,

    /// The payload at archive time.
    pub data: Value,

    /// The metadata at archive time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Original creator of the record.
    pub created_by: String,

    /// Actor of the change that produced the archived version.
    pub updated_by: String,

    /// Actor whose mutation caused the archiving.
    pub archived_by: String,

    /// Original creation time of the record.
    pub created_at: DateTime<Utc>,

    /// When the archived version was written.
    pub updated_at: DateTime<Utc>,

    /// When the snapshot was taken.
    pub archived_at: DateTime<Utc>,
}

/// A single entry in a record's version history.
///
/// The first page of a history listing starts with a synthetic entry built
/// from the live record (`is_current == true`); every other entry is an
/// archived snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The version this entry describes.
    pub version: u64,

    /// The record type at this version.
    #[serde(rename = "type")]
    pub record_type: String,

    /// The payload at this version.
    pub data: Value,

    /// The metadata at this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Actor of the change that produced this version.
    pub updated_by: String,

    /// When this version was written.
    pub updated_at: DateTime<Utc>,

    /// Actor whose mutation archived this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<String>,

    /// When this version was archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,

    /// Whether this entry reflects the live record.
    pub is_current: bool,
}

impl HistoryEntry {
    /// Builds the synthetic "current" entry from the live record.
    pub fn current(record: &Record) -> Self {
        Self {
            version: record.version,
            record_type: record.record_type.clone(),
            data: record.data.clone(),
            metadata: record.metadata.clone(),
            updated_by: record.updated_by.clone(),
            updated_at: record.updated_at,
            archived_by: None,
            archived_at: None,
            is_current: true,
        }
    }
}

impl From<VersionSnapshot> for HistoryEntry {
    fn from(snapshot: VersionSnapshot) -> Self {
        Self {
            version: snapshot.version,
            record_type: snapshot.record_type,
            data: snapshot.data,
            metadata: snapshot.metadata,
            updated_by: snapshot.updated_by,
            updated_at: snapshot.updated_at,
            archived_by: Some(snapshot.archived_by),
            archived_at: Some(snapshot.archived_at),
            is_current: false,
        }
    }
}
