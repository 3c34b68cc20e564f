//! SQLite schema definitions and migrations.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

fn migration_error(step: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::MigrationError {
        message: format!("{}: {}", step, e),
    })
}

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, 1)?;
        migrate_schema(conn, 1)?;
    } else if current_version < SCHEMA_VERSION {
        migrate_schema(conn, current_version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;

    Ok(())
}

/// Create the version 1 schema: live records and their archived versions.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            record_type TEXT NOT NULL,
            data TEXT NOT NULL,
            metadata TEXT,
            created_by TEXT NOT NULL,
            updated_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL CHECK (version >= 1),
            deleted_at TEXT,
            deleted_by TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_records_type
            ON records(record_type, created_at);
        CREATE INDEX IF NOT EXISTS idx_records_created_at
            ON records(created_at);
        CREATE INDEX IF NOT EXISTS idx_records_created_by
            ON records(created_by);
        CREATE INDEX IF NOT EXISTS idx_records_deleted_at
            ON records(deleted_at);

        CREATE TABLE IF NOT EXISTS record_versions (
            record_id TEXT NOT NULL REFERENCES records(id),
            version INTEGER NOT NULL,
            record_type TEXT NOT NULL,
            data TEXT NOT NULL,
            metadata TEXT,
            created_by TEXT NOT NULL,
            updated_by TEXT NOT NULL,
            archived_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            archived_at TEXT NOT NULL,
            PRIMARY KEY (record_id, version)
        );",
    )
    .map_err(|e| migration_error("Failed to create v1 schema", e))
}

/// Run migrations from `from_version` up to [`SCHEMA_VERSION`].
fn migrate_schema(conn: &Connection, from_version: i32) -> StorageResult<()> {
    let mut version = from_version;

    while version < SCHEMA_VERSION {
        match version {
            1 => migrate_v1_to_v2(conn)?,
            other => {
                return Err(StorageError::Backend(BackendError::MigrationError {
                    message: format!("no migration from schema version {}", other),
                }));
            }
        }
        version += 1;
        set_schema_version(conn, version)?;
        tracing::debug!(version, "Migrated record schema");
    }

    Ok(())
}

/// Version 2: archived versions become append-only.
fn migrate_v1_to_v2(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TRIGGER IF NOT EXISTS record_versions_no_update
            BEFORE UPDATE ON record_versions
        BEGIN
            SELECT RAISE(ABORT, 'record versions are immutable');
        END;

        CREATE TRIGGER IF NOT EXISTS record_versions_no_delete
            BEFORE DELETE ON record_versions
        BEGIN
            SELECT RAISE(ABORT, 'record versions are append-only');
        END;",
    )
    .map_err(|e| migration_error("Failed to migrate schema to v2", e))
}
