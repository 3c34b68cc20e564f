//! Record lifecycle: create, read, update, soft-delete and recover.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::RecordServiceConfig;
use crate::core::validation::{check_metadata, check_payload};
use crate::core::{
    RecordEvent, RecordEventSink, RecordStore, ValidationGateway, WritePrecondition,
};
use crate::error::{
    ConcurrencyError, RecordError, StorageResult, ValidationError,
};
use crate::filter::{
    AdvancedFilter, BasicFilter, Column, DynamicFilter, FilterEngine, Predicate, RecordQuery, Sort,
};
use crate::types::{CreateRecord, Page, Record, RecordPatch};

use super::base::{Mutation, ServiceBase, not_found};

/// Creates, reads, updates, soft-deletes and recovers records.
///
/// Every content-changing write archives the prior state in the same
/// transaction as the write itself.
#[derive(Clone)]
pub struct CrudService {
    base: ServiceBase,
    filters: FilterEngine,
}

impl CrudService {
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
        let filters = FilterEngine::new(base.config.clone());
        Self { base, filters }
    }

    /// Creates a record at version 1.
    ///
    /// The stored payload and metadata are the values returned by the
    /// validation gateway. A caller-supplied id that is already taken, by an
    /// active or a deleted record, fails with `AlreadyExists`.
    #[instrument(skip(self, input), fields(record_type = %input.record_type))]
    pub async fn create(&self, input: CreateRecord, actor: &str) -> StorageResult<Record> {
        if input.record_type.trim().is_empty() {
            return Err(missing("type"));
        }
        let Some(data) = input.data else {
            return Err(missing("data"));
        };
        if input.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(missing("id"));
        }

        let validator = self.base.validator.as_ref();
        let data = check_payload(validator, &input.record_type, &data)?;
        let metadata = input
            .metadata
            .as_ref()
            .map(|metadata| check_metadata(validator, metadata))
            .transpose()?;

        let id = input.id.unwrap_or_else(Record::generate_id);
        let record = Record::new(id, input.record_type, data, metadata, actor);
        self.base.insert(&record).await?;

        info!(id = %record.id, "Created record");
        self.base.publish(RecordEvent::Created {
            id: record.id.clone(),
            record_type: record.record_type.clone(),
            actor: actor.to_string(),
        });

        Ok(record)
    }

    /// Returns an active record.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> StorageResult<Record> {
        debug!("Reading record");
        self.base.load_active(id).await
    }

    /// Returns `true` if an active record with this id exists.
    pub async fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.base.store.read_active(id).await?.is_some())
    }

    /// Counts active records, optionally of one type.
    pub async fn count(&self, record_type: Option<&str>) -> StorageResult<u64> {
        let predicate = match record_type {
            Some(record_type) => Predicate::eq(Column::Type, record_type).active_only(),
            None => Predicate::not_deleted(),
        };
        self.base.store.count(&predicate).await
    }

    /// Applies a patch to an active record.
    ///
    /// With `expected_version` set, a record at any other version fails with
    /// a version conflict before anything is validated or written.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: &str,
        patch: RecordPatch,
        actor: &str,
        expected_version: Option<u64>,
    ) -> StorageResult<Record> {
        let current = self.base.load_active(id).await?;

        if let Some(expected) = expected_version
            && expected != current.version
        {
            return Err(ConcurrencyError::VersionConflict {
                id: id.to_string(),
                expected_version: expected,
                actual_version: current.version,
            }
            .into());
        }

        let validator = self.base.validator.as_ref();

        let updated = self
            .base
            .mutate(
                current,
                expected_version,
                |latest| latest.filter(Record::is_active).ok_or_else(|| not_found(id)),
                |current| {
                    let record_type = patch
                        .record_type
                        .clone()
                        .unwrap_or_else(|| current.record_type.clone());
                    if record_type.trim().is_empty() {
                        return Err(missing("type"));
                    }

                    let data = match &patch.data {
                        Some(data) => check_payload(validator, &record_type, data)?,
                        None if record_type != current.record_type => {
                            check_payload(validator, &record_type, &current.data)?
                        }
                        None => current.data.clone(),
                    };
                    let metadata = match &patch.metadata {
                        Some(metadata) => Some(check_metadata(validator, metadata)?),
                        None => current.metadata.clone(),
                    };

                    Ok(Mutation {
                        next: current
                            .clone()
                            .next_version(record_type, data, metadata, actor),
                        precondition: WritePrecondition::active(current.version),
                        archived_by: Some(actor.to_string()),
                    })
                },
            )
            .await?;

        info!(version = updated.version, "Updated record");
        self.base.publish(RecordEvent::Updated {
            id: updated.id.clone(),
            version: updated.version,
            actor: actor.to_string(),
        });

        Ok(updated)
    }

    /// Soft-deletes an active record. The version is left unchanged.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str, actor: &str) -> StorageResult<()> {
        let current = self.base.load_active(id).await?;

        let deleted = self
            .base
            .mutate(
                current,
                None,
                |latest| latest.filter(Record::is_active).ok_or_else(|| not_found(id)),
                |current| {
                    Ok(Mutation {
                        next: current.clone().mark_deleted(actor),
                        precondition: WritePrecondition::active(current.version),
                        archived_by: Some(actor.to_string()),
                    })
                },
            )
            .await?;

        info!(version = deleted.version, "Deleted record");
        self.base.publish(RecordEvent::Deleted {
            id: deleted.id.clone(),
            version: deleted.version,
            actor: actor.to_string(),
        });

        Ok(())
    }

    /// Recovers a soft-deleted record at the next version.
    ///
    /// Recovery writes no snapshot. A record that is not deleted fails with
    /// `NotDeleted`; one that became active while this call was running
    /// fails with `AlreadyActive`.
    #[instrument(skip(self))]
    pub async fn recover(&self, id: &str, actor: &str) -> StorageResult<Record> {
        let current = self.base.load_any(id).await?;
        if current.is_active() {
            return Err(RecordError::NotDeleted { id: id.to_string() }.into());
        }
        if self.base.store.read_active(id).await?.is_some() {
            return Err(RecordError::AlreadyActive { id: id.to_string() }.into());
        }

        let recovered = self
            .base
            .mutate(
                current,
                None,
                |latest| admit_recoverable(id, latest),
                |current| plan_recovery(current, actor),
            )
            .await?;

        info!(version = recovered.version, "Recovered record");
        self.base.publish(RecordEvent::Recovered {
            id: recovered.id.clone(),
            version: recovered.version,
            actor: actor.to_string(),
        });

        Ok(recovered)
    }

    /// Lists active records matching a basic filter, newest first.
    pub async fn list(&self, filter: &BasicFilter) -> StorageResult<Page<Record>> {
        let query = self.filters.basic(filter)?;
        self.run(&query).await
    }

    /// Runs an advanced search over active records.
    pub async fn search(&self, filter: &AdvancedFilter) -> StorageResult<Page<Record>> {
        let query = self.filters.advanced(filter)?;
        self.run(&query).await
    }

    /// Runs dynamic filters over active records. All filters must match.
    pub async fn filter(
        &self,
        filters: &[DynamicFilter],
        page: Option<u32>,
        limit: Option<u32>,
        sort: Option<Sort>,
    ) -> StorageResult<Page<Record>> {
        let query = self.filters.dynamic(filters, page, limit, sort)?;
        self.run(&query).await
    }

    async fn run(&self, query: &RecordQuery) -> StorageResult<Page<Record>> {
        let page = self.base.store.query(query).await?;
        debug!(
            returned = page.len(),
            total = page.total(),
            page = query.pagination.page,
            "Ran record query"
        );
        Ok(page)
    }
}

/// Accepts a fresh row for recovery only while it is still soft-deleted.
fn admit_recoverable(id: &str, latest: Option<Record>) -> StorageResult<Record> {
    match latest {
        None => Err(not_found(id)),
        Some(record) if record.is_active() => {
            Err(RecordError::AlreadyActive { id: id.to_string() }.into())
        }
        Some(record) => Ok(record),
    }
}

fn plan_recovery(current: &Record, actor: &str) -> StorageResult<Mutation> {
    Ok(Mutation {
        next: current.clone().recovered(actor),
        precondition: WritePrecondition::deleted(current.version),
        archived_by: None,
    })
}

fn missing(field: &str) -> crate::error::StorageError {
    ValidationError::MissingRequiredField {
        field: field.to_string(),
    }
    .into()
}
