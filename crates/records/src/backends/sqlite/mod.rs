//! SQLite backend implementation.
//!
//! Supports both in-memory databases (great for testing) and file-based
//! databases. Payloads are stored as JSON text and queried with
//! `json_extract`; write transactions start with `BEGIN IMMEDIATE`, so
//! concurrent writers queue on the database lock instead of failing midway.
//!
//! # Example
//!
//! ```no_run
//! use helios_records::backends::sqlite::SqliteBackend;
//! use helios_records::core::RecordStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Schema is created on open
//! let backend = SqliteBackend::open("records.db")?;
//!
//! let record = backend.read_active("inv-1").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- Live records
//! CREATE TABLE records (
//!     id TEXT PRIMARY KEY,
//!     record_type TEXT NOT NULL,
//!     data TEXT NOT NULL,          -- JSON payload
//!     metadata TEXT,               -- JSON metadata
//!     created_by TEXT NOT NULL,
//!     updated_by TEXT NOT NULL,
//!     created_at TEXT NOT NULL,    -- RFC 3339, microseconds, UTC
//!     updated_at TEXT NOT NULL,
//!     version INTEGER NOT NULL CHECK (version >= 1),
//!     deleted_at TEXT,
//!     deleted_by TEXT
//! );
//!
//! -- Archived versions; append-only
//! CREATE TABLE record_versions (
//!     record_id TEXT NOT NULL REFERENCES records(id),
//!     version INTEGER NOT NULL,
//!     record_type TEXT NOT NULL,
//!     data TEXT NOT NULL,
//!     metadata TEXT,
//!     created_by TEXT NOT NULL,
//!     updated_by TEXT NOT NULL,
//!     archived_by TEXT NOT NULL,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     archived_at TEXT NOT NULL,
//!     PRIMARY KEY (record_id, version)
//! );
//! ```

mod backend;
mod query_builder;
mod schema;
mod storage;
mod transaction;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use transaction::SqliteTransaction;
