//! RecordStore implementation for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde_json::Value;

use crate::core::{RecordStore, RecordTransaction};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::filter::{Predicate, RecordQuery};
use crate::types::{Page, PageInfo, Record, VersionSnapshot};

use super::SqliteBackend;
use super::query_builder::{RECORD_COLUMNS, build_count, build_select};
use super::transaction::SqliteTransaction;

/// Columns selected for a snapshot row, in the order [`map_snapshot_row`]
/// reads them.
pub(crate) const SNAPSHOT_COLUMNS: &str = "record_id, version, record_type, data, metadata, \
    created_by, updated_by, archived_by, created_at, updated_at, archived_at";

fn query_error(e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::QueryError {
        message: e.to_string(),
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("Invalid stored timestamp '{}': {}", value, e)))
}

fn parse_json(value: &str) -> StorageResult<Value> {
    serde_json::from_str(value)
        .map_err(|e| serialization_error(format!("Failed to deserialize payload: {}", e)))
}

fn non_negative(value: i64) -> StorageResult<u64> {
    u64::try_from(value)
        .map_err(|_| serialization_error(format!("Invalid stored count or version: {}", value)))
}

/// A raw `records` row.
pub(crate) struct RecordRow {
    id: String,
    record_type: String,
    data: String,
    metadata: Option<String>,
    created_by: String,
    updated_by: String,
    created_at: String,
    updated_at: String,
    version: i64,
    deleted_at: Option<String>,
    deleted_by: Option<String>,
}

pub(crate) fn map_record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        record_type: row.get(1)?,
        data: row.get(2)?,
        metadata: row.get(3)?,
        created_by: row.get(4)?,
        updated_by: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        version: row.get(8)?,
        deleted_at: row.get(9)?,
        deleted_by: row.get(10)?,
    })
}

impl RecordRow {
    pub(crate) fn into_record(self) -> StorageResult<Record> {
        Ok(Record {
            data: parse_json(&self.data)?,
            metadata: self.metadata.as_deref().map(parse_json).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            version: non_negative(self.version)?,
            deleted_at: self.deleted_at.as_deref().map(parse_timestamp).transpose()?,
            id: self.id,
            record_type: self.record_type,
            created_by: self.created_by,
            updated_by: self.updated_by,
            deleted_by: self.deleted_by,
        })
    }
}

/// A raw `record_versions` row.
struct SnapshotRow {
    record_id: String,
    version: i64,
    record_type: String,
    data: String,
    metadata: Option<String>,
    created_by: String,
    updated_by: String,
    archived_by: String,
    created_at: String,
    updated_at: String,
    archived_at: String,
}

fn map_snapshot_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        record_id: row.get(0)?,
        version: row.get(1)?,
        record_type: row.get(2)?,
        data: row.get(3)?,
        metadata: row.get(4)?,
        created_by: row.get(5)?,
        updated_by: row.get(6)?,
        archived_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        archived_at: row.get(10)?,
    })
}

impl SnapshotRow {
    fn into_snapshot(self) -> StorageResult<VersionSnapshot> {
        Ok(VersionSnapshot {
            version: non_negative(self.version)?,
            data: parse_json(&self.data)?,
            metadata: self.metadata.as_deref().map(parse_json).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            archived_at: parse_timestamp(&self.archived_at)?,
            record_id: self.record_id,
            record_type: self.record_type,
            created_by: self.created_by,
            updated_by: self.updated_by,
            archived_by: self.archived_by,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self, id: &str) -> StorageResult<Option<Record>> {
        let conn = self.get_connection()?;
        let sql = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);

        let row = conn
            .query_row(&sql, params![id], map_record_row)
            .optional()
            .map_err(query_error)?;

        row.map(RecordRow::into_record).transpose()
    }

    async fn query(&self, query: &RecordQuery) -> StorageResult<Page<Record>> {
        let conn = self.get_connection()?;

        let count = build_count(&query.predicate);
        let total: i64 = conn
            .query_row(&count.sql, params_from_iter(count.params.iter()), |row| {
                row.get(0)
            })
            .map_err(query_error)?;

        let select = build_select(query);
        tracing::debug!(sql = %select.sql, params = select.params.len(), "Running record query");

        let mut stmt = conn.prepare(&select.sql).map_err(query_error)?;
        let rows = stmt
            .query_map(params_from_iter(select.params.iter()), map_record_row)
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        let items = rows
            .into_iter()
            .map(RecordRow::into_record)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Page::new(
            items,
            PageInfo::new(query.pagination, non_negative(total)?),
        ))
    }

    async fn count(&self, predicate: &Predicate) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let count = build_count(predicate);
        let total: i64 = conn
            .query_row(&count.sql, params_from_iter(count.params.iter()), |row| {
                row.get(0)
            })
            .map_err(query_error)?;
        non_negative(total)
    }

    async fn snapshots(
        &self,
        id: &str,
        offset: u64,
        limit: u32,
    ) -> StorageResult<Vec<VersionSnapshot>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM record_versions WHERE record_id = ?1
             ORDER BY version DESC LIMIT ?2 OFFSET ?3",
            SNAPSHOT_COLUMNS
        );

        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&sql).map_err(query_error)?;
        let rows = stmt
            .query_map(params![id, i64::from(limit), offset], map_snapshot_row)
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }

    async fn snapshot_count(&self, id: &str) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM record_versions WHERE record_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        non_negative(total)
    }

    async fn read_snapshot(
        &self,
        id: &str,
        version: u64,
    ) -> StorageResult<Option<VersionSnapshot>> {
        let Ok(version) = i64::try_from(version) else {
            return Ok(None);
        };
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM record_versions WHERE record_id = ?1 AND version = ?2",
            SNAPSHOT_COLUMNS
        );

        let row = conn
            .query_row(&sql, params![id, version], map_snapshot_row)
            .optional()
            .map_err(query_error)?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }

    async fn snapshot_versions(&self, id: &str) -> StorageResult<Vec<u64>> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare("SELECT version FROM record_versions WHERE record_id = ?1 ORDER BY version ASC")
            .map_err(query_error)?;
        let versions = stmt
            .query_map(params![id], |row| row.get::<_, i64>(0))
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        versions.into_iter().map(non_negative).collect()
    }

    async fn begin_transaction(&self) -> StorageResult<Box<dyn RecordTransaction>> {
        let conn = self.get_connection()?;
        Ok(Box::new(SqliteTransaction::begin(conn)?))
    }
}
