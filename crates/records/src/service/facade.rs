//! The [`RecordService`] facade.

use std::sync::Arc;

use crate::config::{ConfigError, RecordServiceConfig};
use crate::core::{
    PermissiveValidator, RecordEventSink, RecordStore, TracingEventSink, ValidationGateway,
};
use crate::error::StorageResult;
use crate::filter::{AdvancedFilter, BasicFilter, DynamicFilter, Sort};
use crate::types::{
    CreateRecord, HistoryEntry, Page, Record, RecordPatch, VersionSnapshot,
};

use super::base::ServiceBase;
use super::crud::CrudService;
use super::versioning::{ConflictCheck, VersioningService};

/// Single entry point for every record operation.
///
/// Built with [`RecordService::builder`]. The record and versioning services
/// share the same gateways and configuration.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use helios_records::backends::sqlite::SqliteBackend;
/// use helios_records::service::RecordService;
/// use helios_records::types::{CreateRecord, RecordPatch};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = RecordService::builder()
///     .store(Arc::new(SqliteBackend::in_memory()?))
///     .build()?;
///
/// let invoice = service
///     .create(CreateRecord::new("invoice", json!({"amount": 100})), "u1")
///     .await?;
/// let invoice = service
///     .update(&invoice.id, RecordPatch::new().data(json!({"amount": 150})), "u1", Some(1))
///     .await?;
/// assert_eq!(invoice.version, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RecordService {
    crud: CrudService,
    versioning: VersioningService,
}

impl RecordService {
    /// Starts building a service.
    pub fn builder() -> RecordServiceBuilder {
        RecordServiceBuilder::new()
    }

    /// The lifecycle service.
    pub fn crud(&self) -> &CrudService {
        &self.crud
    }

    /// The history service.
    pub fn versioning(&self) -> &VersioningService {
        &self.versioning
    }

    /// See [`CrudService::create`].
    pub async fn create(&self, input: CreateRecord, actor: &str) -> StorageResult<Record> {
        self.crud.create(input, actor).await
    }

    /// See [`CrudService::get_by_id`].
    pub async fn get_by_id(&self, id: &str) -> StorageResult<Record> {
        self.crud.get_by_id(id).await
    }

    /// See [`CrudService::exists`].
    pub async fn exists(&self, id: &str) -> StorageResult<bool> {
        self.crud.exists(id).await
    }

    /// See [`CrudService::count`].
    pub async fn count(&self, record_type: Option<&str>) -> StorageResult<u64> {
        self.crud.count(record_type).await
    }

    /// See [`CrudService::update`].
    pub async fn update(
        &self,
        id: &str,
        patch: RecordPatch,
        actor: &str,
        expected_version: Option<u64>,
    ) -> StorageResult<Record> {
        self.crud.update(id, patch, actor, expected_version).await
    }

    /// See [`CrudService::delete`].
    pub async fn delete(&self, id: &str, actor: &str) -> StorageResult<()> {
        self.crud.delete(id, actor).await
    }

    /// See [`CrudService::recover`].
    pub async fn recover(&self, id: &str, actor: &str) -> StorageResult<Record> {
        self.crud.recover(id, actor).await
    }

    /// See [`CrudService::list`].
    pub async fn list(&self, filter: &BasicFilter) -> StorageResult<Page<Record>> {
        self.crud.list(filter).await
    }

    /// See [`CrudService::search`].
    pub async fn search(&self, filter: &AdvancedFilter) -> StorageResult<Page<Record>> {
        self.crud.search(filter).await
    }

    /// See [`CrudService::filter`].
    pub async fn filter(
        &self,
        filters: &[DynamicFilter],
        page: Option<u32>,
        limit: Option<u32>,
        sort: Option<Sort>,
    ) -> StorageResult<Page<Record>> {
        self.crud.filter(filters, page, limit, sort).await
    }

    /// See [`VersioningService::get_history`].
    pub async fn get_history(
        &self,
        id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> StorageResult<Page<HistoryEntry>> {
        self.versioning.get_history(id, page, limit).await
    }

    /// See [`VersioningService::restore`].
    pub async fn restore(&self, id: &str, version: u64, actor: &str) -> StorageResult<Record> {
        self.versioning.restore(id, version, actor).await
    }

    /// See [`VersioningService::check_conflict`].
    pub async fn check_conflict(
        &self,
        id: &str,
        last_known_version: u64,
    ) -> StorageResult<ConflictCheck> {
        self.versioning.check_conflict(id, last_known_version).await
    }

    /// See [`VersioningService::get_version`].
    pub async fn get_version(&self, id: &str, version: u64) -> StorageResult<VersionSnapshot> {
        self.versioning.get_version(id, version).await
    }

    /// See [`VersioningService::list_versions`].
    pub async fn list_versions(&self, id: &str) -> StorageResult<Vec<u64>> {
        self.versioning.list_versions(id).await
    }
}

/// Builder for [`RecordService`].
///
/// Only the store is required. Validation defaults to
/// [`PermissiveValidator`] and events to [`TracingEventSink`].
pub struct RecordServiceBuilder {
    store: Option<Arc<dyn RecordStore>>,
    validator: Option<Arc<dyn ValidationGateway>>,
    events: Option<Arc<dyn RecordEventSink>>,
    config: RecordServiceConfig,
}

impl RecordServiceBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            validator: None,
            events: None,
            config: RecordServiceConfig::default(),
        }
    }

    /// Sets the record store.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the validation gateway.
    pub fn validator(mut self, validator: Arc<dyn ValidationGateway>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Sets the event sink.
    pub fn events(mut self, events: Arc<dyn RecordEventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Sets the service configuration.
    pub fn config(mut self, config: RecordServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the service, rejecting a missing store or invalid configuration.
    pub fn build(self) -> Result<RecordService, ConfigError> {
        let mut problems = self.config.validate().err().unwrap_or_default();
        if self.store.is_none() {
            problems.insert(0, "A record store is required".to_string());
        }

        let Some(store) = self.store.filter(|_| problems.is_empty()) else {
            return Err(ConfigError { problems });
        };

        let base = ServiceBase {
            store,
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(PermissiveValidator)),
            events: self.events.unwrap_or_else(|| Arc::new(TracingEventSink)),
            config: self.config,
        };

        Ok(RecordService {
            crud: CrudService::from_base(base.clone()),
            versioning: VersioningService::from_base(base),
        })
    }
}

impl Default for RecordServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
