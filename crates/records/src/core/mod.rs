//! Core traits and collaborator seams.
//!
//! - [`RecordStore`] - Reads, predicate queries and snapshot access
//! - [`RecordTransaction`] - The archive-then-mutate unit of work
//! - [`ValidationGateway`] - Per-type payload and metadata validation
//! - [`RecordEventSink`] - Best-effort business events
//!
//! The services only ever talk to these traits. A backend implements
//! [`RecordStore`] and hands out [`RecordTransaction`]s; conditional writes
//! keyed on `(id, version, state)` make concurrent writers safe without
//! application-level locks.

pub mod events;
pub mod storage;
pub mod transaction;
pub mod validation;

pub use events::{EventSinkError, RecordEvent, RecordEventSink, TracingEventSink};
pub use storage::RecordStore;
pub use transaction::{RecordState, RecordTransaction, WritePrecondition};
pub use validation::{PermissiveValidator, ValidationGateway, ValidationOutcome};
