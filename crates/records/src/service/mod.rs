//! Record services.
//!
//! [`CrudService`] owns the record lifecycle and [`VersioningService`] the
//! archived history. Both write through the same archive-then-mutate unit of
//! work: the prior state is inserted as a snapshot and the record is written
//! with a conditional update in one transaction, so either both land or
//! neither does.
//!
//! [`RecordService`] wraps the two behind one facade.

mod base;
mod crud;
mod facade;
mod versioning;

pub use crud::CrudService;
pub use facade::{RecordService, RecordServiceBuilder};
pub use versioning::{ConflictCheck, VersioningService};
