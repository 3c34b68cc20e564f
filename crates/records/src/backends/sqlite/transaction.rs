//! Transaction support for SQLite backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

use crate::core::{RecordState, RecordTransaction, WritePrecondition};
use crate::error::{
    BackendError, RecordError, StorageError, StorageResult, TransactionError,
};
use crate::types::{Record, VersionSnapshot};

use super::query_builder::{RECORD_COLUMNS, format_timestamp};
use super::storage::{RecordRow, map_record_row};

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

fn to_json(value: &serde_json::Value) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_i64(version: u64) -> StorageResult<i64> {
    i64::try_from(version).map_err(|_| internal_error(format!("Version out of range: {}", version)))
}

/// A SQLite write transaction, opened with `BEGIN IMMEDIATE`.
pub struct SqliteTransaction {
    /// The connection used for this transaction.
    conn: Mutex<PooledConnection<SqliteConnectionManager>>,
    /// Whether the transaction is still active.
    active: bool,
}

impl std::fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("active", &self.active)
            .finish()
    }
}

impl SqliteTransaction {
    /// Starts a transaction on a pooled connection.
    pub(crate) fn begin(conn: PooledConnection<SqliteConnectionManager>) -> StorageResult<Self> {
        conn.execute_batch("BEGIN IMMEDIATE").map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", e),
            })
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            active: true,
        })
    }

    fn ensure_active(&self) -> StorageResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(StorageError::Transaction(TransactionError::InvalidTransaction))
        }
    }
}

#[async_trait]
impl RecordTransaction for SqliteTransaction {
    async fn read(&mut self, id: &str) -> StorageResult<Option<Record>> {
        self.ensure_active()?;

        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);
        let row = conn
            .query_row(&sql, params![id], map_record_row)
            .optional()?;

        row.map(RecordRow::into_record).transpose()
    }

    async fn insert(&mut self, record: &Record) -> StorageResult<()> {
        self.ensure_active()?;

        let conn = self.conn.lock();

        let exists = conn
            .query_row(
                "SELECT 1 FROM records WHERE id = ?1",
                params![record.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if exists {
            return Err(StorageError::Record(RecordError::AlreadyExists {
                id: record.id.clone(),
            }));
        }

        let metadata = record.metadata.as_ref().map(to_json).transpose()?;
        conn.execute(
            "INSERT INTO records (id, record_type, data, metadata, created_by, updated_by,
                created_at, updated_at, version, deleted_at, deleted_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.record_type,
                to_json(&record.data)?,
                metadata,
                record.created_by,
                record.updated_by,
                format_timestamp(&record.created_at),
                format_timestamp(&record.updated_at),
                to_i64(record.version)?,
                record.deleted_at.as_ref().map(format_timestamp),
                record.deleted_by,
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert record: {}", e)))?;

        Ok(())
    }

    async fn archive(&mut self, snapshot: &VersionSnapshot) -> StorageResult<()> {
        self.ensure_active()?;

        let conn = self.conn.lock();
        let metadata = snapshot.metadata.as_ref().map(to_json).transpose()?;
        conn.execute(
            "INSERT INTO record_versions (record_id, version, record_type, data, metadata,
                created_by, updated_by, archived_by, created_at, updated_at, archived_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                snapshot.record_id,
                to_i64(snapshot.version)?,
                snapshot.record_type,
                to_json(&snapshot.data)?,
                metadata,
                snapshot.created_by,
                snapshot.updated_by,
                snapshot.archived_by,
                format_timestamp(&snapshot.created_at),
                format_timestamp(&snapshot.updated_at),
                format_timestamp(&snapshot.archived_at),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to archive version: {}", e)))?;

        Ok(())
    }

    async fn write(
        &mut self,
        record: &Record,
        precondition: WritePrecondition,
    ) -> StorageResult<bool> {
        self.ensure_active()?;

        let state_clause = match precondition.state {
            RecordState::Active => "deleted_at IS NULL",
            RecordState::Deleted => "deleted_at IS NOT NULL",
        };
        let sql = format!(
            "UPDATE records
             SET record_type = ?1, data = ?2, metadata = ?3, updated_by = ?4, updated_at = ?5,
                 version = ?6, deleted_at = ?7, deleted_by = ?8
             WHERE id = ?9 AND version = ?10 AND {}",
            state_clause
        );

        let conn = self.conn.lock();
        let metadata = record.metadata.as_ref().map(to_json).transpose()?;
        let changed = conn
            .execute(
                &sql,
                params![
                    record.record_type,
                    to_json(&record.data)?,
                    metadata,
                    record.updated_by,
                    format_timestamp(&record.updated_at),
                    to_i64(record.version)?,
                    record.deleted_at.as_ref().map(format_timestamp),
                    record.deleted_by,
                    record.id,
                    to_i64(precondition.version)?,
                ],
            )
            .map_err(|e| internal_error(format!("Failed to write record: {}", e)))?;

        Ok(changed == 1)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        let conn = self.conn.lock();
        conn.execute_batch("COMMIT").map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Commit failed: {}", e),
            })
        })?;
        drop(conn);

        self.active = false;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        let conn = self.conn.lock();
        conn.execute_batch("ROLLBACK").map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Rollback failed: {}", e),
            })
        })?;
        drop(conn);

        self.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        // Roll back if neither committed nor rolled back
        if self.active {
            let conn = self.conn.lock();
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "Failed to roll back abandoned transaction");
            }
        }
    }
}
