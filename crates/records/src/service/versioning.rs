//! Version history: paginated history, restore, vread and conflict checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::RecordServiceConfig;
use crate::core::{RecordEvent, RecordEventSink, RecordStore, ValidationGateway, WritePrecondition};
use crate::error::{RecordError, StorageResult};
use crate::types::{HistoryEntry, Page, PageInfo, Record, VersionSnapshot};

use super::base::{Mutation, ServiceBase, not_found};

/// Result of comparing a caller's last known version with the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheck {
    /// `true` when the record has moved past the caller's version.
    pub has_conflict: bool,
    /// The stored version.
    pub current_version: u64,
    /// Actor of the latest change.
    pub last_modified_by: String,
    /// Time of the latest change.
    pub last_modified_at: DateTime<Utc>,
}

/// Reads and restores archived versions.
#[derive(Clone)]
pub struct VersioningService {
    base: ServiceBase,
}

impl VersioningService {
    /// Creates a service over the given gateways.
    pub fn new(
        store: Arc<dyn RecordStore>,
        validator: Arc<dyn ValidationGateway>,
        events: Arc<dyn RecordEventSink>,
        config: RecordServiceConfig,
    ) -> Self {
        Self::from_base(ServiceBase {
            store,
            validator,
            events,
            config,
        })
    }

    pub(crate) fn from_base(base: ServiceBase) -> Self {
        Self { base }
    }

    /// Returns a page of a record's history, newest first.
    ///
    /// Archived snapshots are paged by `page` and `limit`. The first page
    /// also starts with an entry for the live record, so it may hold
    /// `limit + 1` entries; `total` counts that entry too. Page navigation
    /// (`total_pages`, `has_next`) follows the snapshot pages only, so the
    /// extra entry never implies a trailing empty page. Deleted records keep
    /// their history.
    #[instrument(skip(self))]
    pub async fn get_history(
        &self,
        id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> StorageResult<Page<HistoryEntry>> {
        let record = self.base.load_any(id).await?;
        let pagination = self.base.config.pagination(page, limit);

        let snapshots = self
            .base
            .store
            .snapshots(id, pagination.offset(), pagination.limit)
            .await?;
        let archived = self.base.store.snapshot_count(id).await?;

        let mut items = Vec::with_capacity(snapshots.len() + 1);
        if pagination.page == 1 {
            items.push(HistoryEntry::current(&record));
        }
        items.extend(snapshots.into_iter().map(HistoryEntry::from));

        debug!(archived, returned = items.len(), "Read record history");
        let mut page_info = PageInfo::new(pagination, archived.max(1));
        page_info.total = archived + 1;
        Ok(Page::new(items, page_info))
    }

    /// Restores the content of an archived version as a new version.
    ///
    /// The live state is archived first; the restored record takes the next
    /// version number and never reuses the snapshot's.
    #[instrument(skip(self))]
    pub async fn restore(&self, id: &str, version: u64, actor: &str) -> StorageResult<Record> {
        let current = self.base.load_active(id).await?;
        let snapshot = self.snapshot(id, version).await?;

        let restored = self
            .base
            .mutate(
                current,
                None,
                |latest| latest.filter(Record::is_active).ok_or_else(|| not_found(id)),
                |current| {
                    Ok(Mutation {
                        next: current.clone().next_version(
                            snapshot.record_type.clone(),
                            snapshot.data.clone(),
                            snapshot.metadata.clone(),
                            actor,
                        ),
                        precondition: WritePrecondition::active(current.version),
                        archived_by: Some(actor.to_string()),
                    })
                },
            )
            .await?;

        info!(
            from_version = version,
            to_version = restored.version,
            "Restored record version"
        );
        self.base.publish(RecordEvent::VersionRestored {
            id: restored.id.clone(),
            from_version: version,
            to_version: restored.version,
            actor: actor.to_string(),
        });

        Ok(restored)
    }

    /// Compares `last_known_version` with the stored version. Writes nothing.
    pub async fn check_conflict(
        &self,
        id: &str,
        last_known_version: u64,
    ) -> StorageResult<ConflictCheck> {
        let record = self.base.load_active(id).await?;
        Ok(ConflictCheck {
            has_conflict: record.version != last_known_version,
            current_version: record.version,
            last_modified_by: record.updated_by,
            last_modified_at: record.updated_at,
        })
    }

    /// Reads one archived version. Works for deleted records too.
    #[instrument(skip(self))]
    pub async fn get_version(&self, id: &str, version: u64) -> StorageResult<VersionSnapshot> {
        self.snapshot(id, version).await
    }

    /// Lists the archived version numbers of a record, ascending.
    pub async fn list_versions(&self, id: &str) -> StorageResult<Vec<u64>> {
        if self.base.store.read(id).await?.is_none() {
            return Err(not_found(id));
        }
        self.base.store.snapshot_versions(id).await
    }

    async fn snapshot(&self, id: &str, version: u64) -> StorageResult<VersionSnapshot> {
        self.base
            .store
            .read_snapshot(id, version)
            .await?
            .ok_or_else(|| {
                RecordError::VersionNotFound {
                    id: id.to_string(),
                    version,
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sqlite::SqliteBackend;
    use crate::core::{PermissiveValidator, TracingEventSink};
    use crate::error::StorageError;
    use crate::service::CrudService;
    use crate::types::{CreateRecord, RecordPatch};
    use serde_json::json;

    fn services() -> (CrudService, VersioningService) {
        let base = ServiceBase {
            store: Arc::new(SqliteBackend::in_memory().unwrap()),
            validator: Arc::new(PermissiveValidator),
            events: Arc::new(TracingEventSink),
            config: RecordServiceConfig::default(),
        };
        (
            CrudService::from_base(base.clone()),
            VersioningService::from_base(base),
        )
    }

    async fn seed(crud: &CrudService, versions: u64) {
        crud.create(CreateRecord::new("note", json!({"n": 1})).with_id("n1"), "u1")
            .await
            .unwrap();
        for n in 2..=versions {
            crud.update("n1", RecordPatch::new().data(json!({"n": n})), "u1", None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_history_first_page_has_current() {
        let (crud, versioning) = services();
        seed(&crud, 4).await;

        let page = versioning.get_history("n1", Some(1), Some(2)).await.unwrap();
        let versions: Vec<u64> = page.items.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![4, 3, 2]);
        assert!(page.items[0].is_current);
        assert!(!page.items[1].is_current);
        assert_eq!(page.page_info.total, 4);

        let page = versioning.get_history("n1", Some(2), Some(2)).await.unwrap();
        let versions: Vec<u64> = page.items.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1]);
        assert!(page.page_info.has_prev);
    }

    #[tokio::test]
    async fn test_history_unknown_record() {
        let (_, versioning) = services();
        let err = versioning.get_history("missing", None, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_restore_takes_next_version() {
        let (crud, versioning) = services();
        seed(&crud, 3).await;

        let restored = versioning.restore("n1", 1, "u2").await.unwrap();
        assert_eq!(restored.version, 4);
        assert_eq!(restored.data, json!({"n": 1}));
        assert_eq!(restored.updated_by, "u2");
        assert_eq!(versioning.list_versions("n1").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_restore_missing_version() {
        let (crud, versioning) = services();
        seed(&crud, 1).await;

        let err = versioning.restore("n1", 9, "u1").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Record(RecordError::VersionNotFound { version: 9, .. })
        ));
        assert_eq!(crud.get_by_id("n1").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_check_conflict_is_a_pure_read() {
        let (crud, versioning) = services();
        seed(&crud, 2).await;

        let first = versioning.check_conflict("n1", 1).await.unwrap();
        let second = versioning.check_conflict("n1", 1).await.unwrap();
        assert_eq!(first, second);
        assert!(first.has_conflict);
        assert_eq!(first.current_version, 2);

        assert!(!versioning.check_conflict("n1", 2).await.unwrap().has_conflict);
    }

    #[tokio::test]
    async fn test_get_version_after_delete() {
        let (crud, versioning) = services();
        seed(&crud, 2).await;
        crud.delete("n1", "u3").await.unwrap();

        let snapshot = versioning.get_version("n1", 2).await.unwrap();
        assert_eq!(snapshot.archived_by, "u3");
        assert_eq!(snapshot.data, json!({"n": 2}));
        assert!(versioning.check_conflict("n1", 2).await.unwrap_err().is_not_found());
    }
}
