//! Helios Records
//!
//! A versioned, soft-deletable store for JSON records with per-type payloads.
//! Every record carries a version counter for optimistic locking, and every
//! content-changing write archives the prior state as an immutable snapshot
//! in the same transaction.
//!
//! # Features
//!
//! - **Lifecycle**: create, read, update, soft-delete and recover
//! - **Optimistic locking**: pin an expected version (an If-Match value) on update
//! - **History**: paginated history, version reads and restore-as-new-version
//! - **Filtering**: basic filters, advanced search and operator-based dynamic
//!   filters, translated into backend-neutral predicate trees
//! - **Pluggable gateways**: storage, payload validation and business events
//!   are injected as trait objects
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! # Architecture
//!
//! - [`types`] - Records, snapshots, inputs and pagination
//! - [`error`] - Error types for all operations
//! - [`core`] - Storage, transaction, validation and event traits
//! - [`filter`] - Filter surfaces and the predicate tree they build
//! - [`service`] - Record and versioning services, and the facade over them
//! - [`backends`] - Backend implementations
//! - [`config`] - Service configuration
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use helios_records::backends::sqlite::SqliteBackend;
//! use helios_records::filter::DynamicFilter;
//! use helios_records::service::RecordService;
//! use helios_records::types::CreateRecord;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RecordService::builder()
//!     .store(Arc::new(SqliteBackend::open("records.db")?))
//!     .build()?;
//!
//! let invoice = service
//!     .create(CreateRecord::new("invoice", json!({"amount": 100})), "u1")
//!     .await?;
//! assert_eq!(invoice.version, 1);
//!
//! let large = service
//!     .filter(
//!         &[
//!             DynamicFilter::new("amount", "gte", json!(100)),
//!             DynamicFilter::new("type", "eq", json!("invoice")),
//!         ],
//!         None,
//!         None,
//!         None,
//!     )
//!     .await?;
//! assert_eq!(large.total(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # ETags
//!
//! Versions travel over HTTP as weak ETags:
//!
//! ```
//! use helios_records::types::parse_etag;
//!
//! assert_eq!(parse_etag("W/\"3\""), Some(3));
//! assert_eq!(parse_etag("\"3\""), Some(3));
//! assert_eq!(parse_etag("3"), Some(3));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod service;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{ConfigError, RecordServiceConfig};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use types::{CreateRecord, HistoryEntry, Page, Pagination, Record, RecordPatch, VersionSnapshot};

// Re-export core traits
pub use crate::core::{RecordEventSink, RecordStore, RecordTransaction, ValidationGateway};

// Re-export services
pub use service::{ConflictCheck, CrudService, RecordService, RecordServiceBuilder, VersioningService};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
