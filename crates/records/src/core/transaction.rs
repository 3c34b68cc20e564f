//! Unit-of-work trait for archive-then-mutate writes.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{Record, VersionSnapshot};

/// The lifecycle state a conditional write expects to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// `deleted_at` is null.
    Active,
    /// `deleted_at` is set.
    Deleted,
}

impl RecordState {
    /// The state of a loaded record.
    pub fn of(record: &Record) -> Self {
        if record.is_active() {
            RecordState::Active
        } else {
            RecordState::Deleted
        }
    }
}

/// Precondition for a conditional write: the stored row must still be at
/// `version` and in `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePrecondition {
    /// Version the stored row must have.
    pub version: u64,
    /// State the stored row must be in.
    pub state: RecordState,
}

impl WritePrecondition {
    /// Requires an active row at `version`.
    pub fn active(version: u64) -> Self {
        Self {
            version,
            state: RecordState::Active,
        }
    }

    /// Requires a soft-deleted row at `version`.
    pub fn deleted(version: u64) -> Self {
        Self {
            version,
            state: RecordState::Deleted,
        }
    }

    /// Whether a loaded record satisfies this precondition.
    pub fn holds_for(&self, record: &Record) -> bool {
        record.version == self.version && RecordState::of(record) == self.state
    }
}

/// A transaction over the record store.
///
/// Nothing is visible to other readers until [`commit`](Self::commit)
/// succeeds. A transaction that is dropped without being committed is rolled
/// back.
///
/// # Example
///
/// ```ignore
/// let mut tx = store.begin_transaction().await?;
/// let current = tx.read("inv-1").await?.ok_or(...)?;
/// tx.archive(&current.to_snapshot("u1")).await?;
/// let next = current.clone().next_version(ty, data, None, "u1");
/// if tx.write(&next, WritePrecondition::active(current.version)).await? {
///     tx.commit().await?;
/// }
/// ```
#[async_trait]
pub trait RecordTransaction: Send + Sync {
    /// Reads a record in any state.
    async fn read(&mut self, id: &str) -> StorageResult<Option<Record>>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// * `StorageError::Record(AlreadyExists)` - If the id is taken, whether
    ///   the existing record is active or deleted
    async fn insert(&mut self, record: &Record) -> StorageResult<()>;

    /// Appends a version snapshot.
    ///
    /// Snapshots are append-only; a second snapshot for the same
    /// `(record_id, version)` is a storage failure.
    async fn archive(&mut self, snapshot: &VersionSnapshot) -> StorageResult<()>;

    /// Overwrites the stored record if it still satisfies `precondition`.
    ///
    /// Returns `false`, writing nothing, if the precondition no longer holds.
    async fn write(
        &mut self,
        record: &Record,
        precondition: WritePrecondition,
    ) -> StorageResult<bool>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back the transaction.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Returns `true` while the transaction can still be used.
    fn is_active(&self) -> bool;
}
