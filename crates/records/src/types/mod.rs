//! Core types for the record store.
//!
//! - [`Record`] - A live document with version and soft-delete metadata
//! - [`VersionSnapshot`] - An immutable archived copy of a past version
//! - [`HistoryEntry`] - One row of a version-history listing
//! - [`CreateRecord`], [`RecordPatch`] - Write inputs
//! - [`Pagination`], [`Page`] - Offset pagination
//!
//! # Examples
//!
//! ```
//! use helios_records::types::{Pagination, PageInfo, Record};
//! use serde_json::json;
//!
//! let record = Record::new("inv-1", "invoice", json!({"amount": 100}), None, "u1");
//! let next = record.next_version("invoice".into(), json!({"amount": 150}), None, "u2");
//! assert_eq!(next.version, 2);
//!
//! let info = PageInfo::new(Pagination::new(2, 10), 35);
//! assert_eq!(info.total_pages, 4);
//! assert!(info.has_prev && info.has_next);
//! ```

mod input;
mod pagination;
mod record;
mod snapshot;

pub use input::{CreateRecord, RecordPatch};
pub use pagination::{Page, PageInfo, Pagination};
pub use record::{Record, normalize_etag, parse_etag};
pub use snapshot::{HistoryEntry, VersionSnapshot};
