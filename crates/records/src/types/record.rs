//! Live record type.
//!
//! This module defines [`Record`], the mutable document entity, together with
//! the state transitions that move it through its lifecycle.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::VersionSnapshot;

/// Returns the current time truncated to the precision the stores persist.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A live document with version and soft-delete metadata.
///
/// A record is *active* while `deleted_at` is `None`. Inactive records are
/// invisible to every read, list and filter operation; only recovery and
/// history can see them.
///
/// # Examples
///
/// ```
/// use helios_records::types::Record;
/// use serde_json::json;
///
/// let record = Record::new("inv-1", "invoice", json!({"amount": 100}), None, "u1");
///
/// assert_eq!(record.version, 1);
/// assert_eq!(record.etag(), "W/\"1\"");
/// assert!(record.is_active());
///
/// let deleted = record.mark_deleted("u2");
/// assert_eq!(deleted.version, 1);
/// assert!(deleted.is_deleted());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Stable, unique identifier.
    pub id: String,

    /// Type tag selecting the validation schema for `data`.
    #[serde(rename = "type")]
    pub record_type: String,

    /// The record payload.
    pub data: Value,

    /// Optional free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Actor that created the record.
    pub created_by: String,

    /// Actor that last changed the record.
    pub updated_by: String,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last changed.
    pub updated_at: DateTime<Utc>,

    /// Version counter, starting at 1.
    pub version: u64,

    /// When the record was soft-deleted.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,

    /// Actor that soft-deleted the record.
    #[serde(default)]
    pub deleted_by: Option<String>,
}

impl Record {
    /// Creates a new active record at version 1.
    pub fn new(
        id: impl Into<String>,
        record_type: impl Into<String>,
        data: Value,
        metadata: Option<Value>,
        actor: &str,
    ) -> Self {
        let now = now();
        Self {
            id: id.into(),
            record_type: record_type.into(),
            data,
            metadata,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Generates a fresh record id.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Returns `true` if the record has not been soft-deleted.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns `true` if the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the weak ETag for the current version.
    pub fn etag(&self) -> String {
        format!("W/\"{}\"", self.version)
    }

    /// Checks if the given ETag matches this record's version.
    pub fn matches_etag(&self, etag: &str) -> bool {
        parse_etag(etag) == Some(self.version)
    }

    /// Creates the next version of this record with new content.
    pub fn next_version(
        self,
        record_type: String,
        data: Value,
        metadata: Option<Value>,
        actor: &str,
    ) -> Self {
        Self {
            record_type,
            data,
            metadata,
            updated_by: actor.to_string(),
            updated_at: now(),
            version: self.version + 1,
            deleted_at: None,
            deleted_by: None,
            ..self
        }
    }

    /// Marks this record as soft-deleted. The version is left unchanged.
    pub fn mark_deleted(self, actor: &str) -> Self {
        Self {
            deleted_at: Some(now()),
            deleted_by: Some(actor.to_string()),
            ..self
        }
    }

    /// Clears the soft-delete markers and advances the version.
    pub fn recovered(self, actor: &str) -> Self {
        Self {
            updated_by: actor.to_string(),
            updated_at: now(),
            version: self.version + 1,
            deleted_at: None,
            deleted_by: None,
            ..self
        }
    }

    /// Builds the archived copy of this record's present state.
    pub fn to_snapshot(&self, archived_by: &str) -> VersionSnapshot {
        VersionSnapshot {
            record_id: self.id.clone(),
            version: self.version,
            record_type: self.record_type.clone(),
            data: self.data.clone(),
            metadata: self.metadata.clone(),
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
            archived_by: archived_by.to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            archived_at: now(),
        }
    }
}

/// Normalizes an ETag or If-Match value to its bare version text.
///
/// `W/"3"`, `"3"` and `3` all normalize to `3`.
pub fn normalize_etag(etag: &str) -> &str {
    etag.trim().trim_start_matches("W/").trim_matches('"')
}

/// Parses an ETag or If-Match value into a version number.
pub fn parse_etag(etag: &str) -> Option<u64> {
    normalize_etag(etag).parse().ok()
}
