//! State shared by the record services, and the archive-then-mutate unit of
//! work both of them write through.

use std::sync::Arc;

use crate::config::RecordServiceConfig;
use crate::core::{
    RecordEvent, RecordEventSink, RecordStore, RecordTransaction, ValidationGateway,
    WritePrecondition,
};
use crate::error::{ConcurrencyError, RecordError, StorageResult};
use crate::types::Record;

/// A planned state transition for one record.
#[derive(Debug, Clone)]
pub(crate) struct Mutation {
    /// The record as it should be stored.
    pub next: Record,
    /// What the stored row must still look like.
    pub precondition: WritePrecondition,
    /// Actor to archive the stored state under; `None` skips archiving.
    pub archived_by: Option<String>,
}

/// Result of one attempt at a mutation.
#[derive(Debug)]
enum Attempt {
    Committed,
    /// The precondition no longer held; carries the row as it is now.
    Stale(Option<Record>),
}

/// Gateways and configuration shared by the services.
#[derive(Clone)]
pub(crate) struct ServiceBase {
    pub store: Arc<dyn RecordStore>,
    pub validator: Arc<dyn ValidationGateway>,
    pub events: Arc<dyn RecordEventSink>,
    pub config: RecordServiceConfig,
}

impl ServiceBase {
    /// Loads an active record or fails with `NotFound`.
    pub async fn load_active(&self, id: &str) -> StorageResult<Record> {
        self.store
            .read_active(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Loads a record in any state or fails with `NotFound`.
    pub async fn load_any(&self, id: &str) -> StorageResult<Record> {
        self.store.read(id).await?.ok_or_else(|| not_found(id))
    }

    /// Publishes an event; failures are logged and swallowed.
    pub fn publish(&self, event: RecordEvent) {
        if let Err(e) = self.events.publish(&event) {
            tracing::warn!(
                event = event.name(),
                id = event.record_id(),
                error = %e,
                "Dropped record event"
            );
        }
    }

    /// Inserts a new record in its own transaction.
    pub async fn insert(&self, record: &Record) -> StorageResult<()> {
        let mut tx = self.store.begin_transaction().await?;
        match tx.insert(record).await {
            Ok(()) => tx.commit().await,
            Err(e) => {
                rollback(tx).await;
                Err(e)
            }
        }
    }

    /// Applies a mutation, re-planning from a fresh read when it loses a race.
    ///
    /// `plan` turns the current record into a [`Mutation`]. When the
    /// conditional write finds the row changed, `admit` checks the fresh row
    /// is still in a state the operation accepts (returning the operation's
    /// error otherwise). A caller-pinned `expected_version` turns a lost race
    /// into a version conflict; otherwise the mutation is re-planned up to
    /// `write_retries` times.
    pub async fn mutate<A, P>(
        &self,
        current: Record,
        expected_version: Option<u64>,
        admit: A,
        mut plan: P,
    ) -> StorageResult<Record>
    where
        A: Fn(Option<Record>) -> StorageResult<Record>,
        P: FnMut(&Record) -> StorageResult<Mutation>,
    {
        let mut current = current;
        let mut retries = 0;

        loop {
            let mutation = plan(&current)?;
            let latest = match self.attempt(&current.id, &mutation).await? {
                Attempt::Committed => return Ok(mutation.next),
                Attempt::Stale(latest) => admit(latest)?,
            };

            if expected_version.is_some() || retries >= self.config.write_retries {
                return Err(ConcurrencyError::VersionConflict {
                    id: current.id.clone(),
                    expected_version: expected_version.unwrap_or(current.version),
                    actual_version: latest.version,
                }
                .into());
            }

            retries += 1;
            tracing::warn!(
                id = %current.id,
                attempt = retries,
                seen_version = current.version,
                latest_version = latest.version,
                "Lost write race, retrying from fresh read"
            );
            current = latest;
        }
    }

    /// Runs archive-then-write as one transaction.
    async fn attempt(&self, id: &str, mutation: &Mutation) -> StorageResult<Attempt> {
        let mut tx = self.store.begin_transaction().await?;

        match apply(tx.as_mut(), id, mutation).await {
            Ok(Attempt::Committed) => {
                tx.commit().await?;
                Ok(Attempt::Committed)
            }
            Ok(stale) => {
                rollback(tx).await;
                Ok(stale)
            }
            Err(e) => {
                rollback(tx).await;
                Err(e)
            }
        }
    }
}

async fn apply(
    tx: &mut dyn RecordTransaction,
    id: &str,
    mutation: &Mutation,
) -> StorageResult<Attempt> {
    let stored = match tx.read(id).await? {
        Some(stored) if mutation.precondition.holds_for(&stored) => stored,
        other => return Ok(Attempt::Stale(other)),
    };

    if let Some(actor) = &mutation.archived_by {
        tx.archive(&stored.to_snapshot(actor)).await?;
    }

    if tx.write(&mutation.next, mutation.precondition).await? {
        Ok(Attempt::Committed)
    } else {
        Ok(Attempt::Stale(tx.read(id).await?))
    }
}

async fn rollback(tx: Box<dyn RecordTransaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Failed to roll back transaction");
    }
}

pub(crate) fn not_found(id: &str) -> crate::error::StorageError {
    RecordError::NotFound { id: id.to_string() }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sqlite::SqliteBackend;
    use crate::core::{PermissiveValidator, TracingEventSink};
    use crate::error::StorageError;
    use serde_json::json;

    fn base() -> ServiceBase {
        ServiceBase {
            store: Arc::new(SqliteBackend::in_memory().unwrap()),
            validator: Arc::new(PermissiveValidator),
            events: Arc::new(TracingEventSink),
            config: RecordServiceConfig::default(),
        }
    }

    fn admit_active(latest: Option<Record>) -> StorageResult<Record> {
        latest.filter(Record::is_active).ok_or_else(|| not_found("r1"))
    }

    fn bump(current: &Record) -> StorageResult<Mutation> {
        Ok(Mutation {
            next: current.clone().next_version(
                current.record_type.clone(),
                json!({"n": current.version + 1}),
                None,
                "u1",
            ),
            precondition: WritePrecondition::active(current.version),
            archived_by: Some("u1".to_string()),
        })
    }

    #[tokio::test]
    async fn test_mutation_archives_and_writes() {
        let base = base();
        let record = Record::new("r1", "note", json!({"n": 1}), None, "u1");
        base.insert(&record).await.unwrap();

        let next = base.mutate(record, None, admit_active, bump).await.unwrap();
        assert_eq!(next.version, 2);
        assert_eq!(base.store.snapshot_count("r1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_read_is_retried() {
        let base = base();
        let record = Record::new("r1", "note", json!({"n": 1}), None, "u1");
        base.insert(&record).await.unwrap();

        // Another writer moves the record on to version 2
        base.mutate(record.clone(), None, admit_active, bump)
            .await
            .unwrap();

        // Planning from the stale copy retries from the fresh row
        let next = base.mutate(record, None, admit_active, bump).await.unwrap();
        assert_eq!(next.version, 3);
        assert_eq!(base.store.snapshot_versions("r1").await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_pinned_version_surfaces_conflict() {
        let base = base();
        let record = Record::new("r1", "note", json!({"n": 1}), None, "u1");
        base.insert(&record).await.unwrap();
        base.mutate(record.clone(), None, admit_active, bump)
            .await
            .unwrap();

        let err = base
            .mutate(record, Some(1), admit_active, bump)
            .await
            .unwrap_err();
        assert_eq!(err.current_version(), Some(2));
        assert_eq!(base.store.snapshot_count("r1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut base = base();
        base.config.write_retries = 0;
        let record = Record::new("r1", "note", json!({"n": 1}), None, "u1");
        base.insert(&record).await.unwrap();
        base.mutate(record.clone(), None, admit_active, bump)
            .await
            .unwrap();

        let err = base
            .mutate(record, None, admit_active, bump)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Concurrency(_)));
    }

    #[tokio::test]
    async fn test_insert_duplicate_rolls_back() {
        let base = base();
        let record = Record::new("r1", "note", json!({}), None, "u1");
        base.insert(&record).await.unwrap();

        let err = base.insert(&record).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Record(RecordError::AlreadyExists { .. })
        ));
        // The pooled connection is usable again
        assert!(base.store.read("r1").await.unwrap().is_some());
    }
}
