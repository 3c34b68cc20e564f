//! Record store trait.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::filter::{Predicate, RecordQuery};
use crate::types::{Page, Record, VersionSnapshot};

use super::transaction::RecordTransaction;

/// Persistence gateway for records and their archived versions.
///
/// Implementations store two kinds of rows: live records keyed by `id`, and
/// immutable version snapshots keyed by `(record_id, version)`. Reads take
/// no locks and observe committed state; every write goes through a
/// [`RecordTransaction`].
///
/// # Example
///
/// ```ignore
/// use helios_records::core::RecordStore;
///
/// async fn print_invoice<S: RecordStore>(store: &S) -> StorageResult<()> {
///     if let Some(record) = store.read_active("inv-1").await? {
///         println!("{} v{}", record.id, record.version);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Reads a record in any state, active or soft-deleted.
    async fn read(&self, id: &str) -> StorageResult<Option<Record>>;

    /// Reads a record only if it is active.
    async fn read_active(&self, id: &str) -> StorageResult<Option<Record>> {
        Ok(self.read(id).await?.filter(Record::is_active))
    }

    /// Runs a predicate query and returns one page plus the total count.
    async fn query(&self, query: &RecordQuery) -> StorageResult<Page<Record>>;

    /// Counts the records matching a predicate.
    async fn count(&self, predicate: &Predicate) -> StorageResult<u64>;

    /// Lists snapshots for a record, newest version first.
    async fn snapshots(
        &self,
        id: &str,
        offset: u64,
        limit: u32,
    ) -> StorageResult<Vec<VersionSnapshot>>;

    /// Counts the snapshots of a record.
    async fn snapshot_count(&self, id: &str) -> StorageResult<u64>;

    /// Reads the snapshot taken at `version`.
    async fn read_snapshot(&self, id: &str, version: u64)
    -> StorageResult<Option<VersionSnapshot>>;

    /// Lists archived version numbers, ascending.
    async fn snapshot_versions(&self, id: &str) -> StorageResult<Vec<u64>>;

    /// Starts a write transaction.
    async fn begin_transaction(&self) -> StorageResult<Box<dyn RecordTransaction>>;
}
