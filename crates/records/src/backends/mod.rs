//! Storage backend implementations.
//!
//! Each backend is behind a feature flag:
//!
//! - `sqlite` (default) - Embedded SQLite via rusqlite and r2d2

#[cfg(feature = "sqlite")]
pub mod sqlite;
