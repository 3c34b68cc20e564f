//! Service factories and test doubles.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use helios_records::backends::sqlite::SqliteBackend;
use helios_records::config::RecordServiceConfig;
use helios_records::core::{
    EventSinkError, RecordEvent, RecordEventSink, RecordStore, RecordTransaction,
    ValidationGateway, ValidationOutcome,
};
use helios_records::error::{StorageResult, ValidationDetail};
use helios_records::filter::{Predicate, RecordQuery};
use helios_records::service::RecordService;
use helios_records::types::{CreateRecord, Page, Record, VersionSnapshot};

/// Actor used by most tests.
pub const ACTOR: &str = "u1";

/// An event sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordEvent>>,
}

impl RecordingSink {
    /// Returns the events received so far.
    pub fn events(&self) -> Vec<RecordEvent> {
        self.events.lock().clone()
    }

    /// Returns the names of the events received so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(RecordEvent::name).collect()
    }
}

impl RecordEventSink for RecordingSink {
    fn publish(&self, event: &RecordEvent) -> Result<(), EventSinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// An event sink that rejects every event.
#[derive(Debug, Default)]
pub struct FailingSink;

impl RecordEventSink for FailingSink {
    fn publish(&self, event: &RecordEvent) -> Result<(), EventSinkError> {
        Err(EventSinkError::new(event, "sink offline"))
    }
}

/// Validates `invoice` payloads and passes every other type through.
///
/// An invoice needs a numeric `amount`; a missing `currency` is filled in
/// with `"USD"`. Metadata must be an object.
#[derive(Debug, Default)]
pub struct InvoiceValidator;

impl ValidationGateway for InvoiceValidator {
    fn validate_by_type(&self, record_type: &str, data: &Value) -> ValidationOutcome {
        if record_type != "invoice" {
            return ValidationOutcome::Valid(data.clone());
        }

        let Some(fields) = data.as_object() else {
            return ValidationOutcome::Invalid(vec![ValidationDetail::new(
                "$",
                "invoice must be an object",
            )]);
        };

        if !fields.get("amount").is_some_and(Value::is_number) {
            return ValidationOutcome::Invalid(vec![ValidationDetail::new(
                "amount",
                "amount must be a number",
            )]);
        }

        let mut normalized = fields.clone();
        normalized
            .entry("currency")
            .or_insert_with(|| json!("USD"));
        ValidationOutcome::Valid(Value::Object(normalized))
    }

    fn validate_metadata(&self, metadata: &Value) -> ValidationOutcome {
        if metadata.is_object() {
            ValidationOutcome::Valid(metadata.clone())
        } else {
            ValidationOutcome::Invalid(vec![ValidationDetail::new(
                "$",
                "metadata must be an object",
            )])
        }
    }
}

/// A store that reports every record as active, as if another active row
/// shared the id of a soft-deleted one.
pub struct ShadowedStore {
    inner: Arc<SqliteBackend>,
}

impl ShadowedStore {
    pub fn new(inner: Arc<SqliteBackend>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RecordStore for ShadowedStore {
    fn backend_name(&self) -> &'static str {
        "shadowed"
    }

    async fn read(&self, id: &str) -> StorageResult<Option<Record>> {
        self.inner.read(id).await
    }

    async fn read_active(&self, id: &str) -> StorageResult<Option<Record>> {
        Ok(self.inner.read(id).await?.map(|record| Record {
            deleted_at: None,
            deleted_by: None,
            ..record
        }))
    }

    async fn query(&self, query: &RecordQuery) -> StorageResult<Page<Record>> {
        self.inner.query(query).await
    }

    async fn count(&self, predicate: &Predicate) -> StorageResult<u64> {
        self.inner.count(predicate).await
    }

    async fn snapshots(
        &self,
        id: &str,
        offset: u64,
        limit: u32,
    ) -> StorageResult<Vec<VersionSnapshot>> {
        self.inner.snapshots(id, offset, limit).await
    }

    async fn snapshot_count(&self, id: &str) -> StorageResult<u64> {
        self.inner.snapshot_count(id).await
    }

    async fn read_snapshot(
        &self,
        id: &str,
        version: u64,
    ) -> StorageResult<Option<VersionSnapshot>> {
        self.inner.read_snapshot(id, version).await
    }

    async fn snapshot_versions(&self, id: &str) -> StorageResult<Vec<u64>> {
        self.inner.snapshot_versions(id).await
    }

    async fn begin_transaction(&self) -> StorageResult<Box<dyn RecordTransaction>> {
        self.inner.begin_transaction().await
    }
}

/// Creates a fresh in-memory SQLite backend.
pub fn create_backend() -> Arc<SqliteBackend> {
    Arc::new(SqliteBackend::in_memory().expect("Failed to create SQLite backend"))
}

/// Creates a service over a fresh in-memory backend with default gateways.
pub fn create_service() -> RecordService {
    RecordService::builder()
        .store(create_backend())
        .build()
        .expect("Failed to build record service")
}

/// Creates a service that validates invoices and records its events.
pub fn create_recording_service() -> (RecordService, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let service = RecordService::builder()
        .store(create_backend())
        .validator(Arc::new(InvoiceValidator))
        .events(sink.clone())
        .build()
        .expect("Failed to build record service");
    (service, sink)
}

/// Creates a service with a custom configuration.
pub fn create_service_with_config(config: RecordServiceConfig) -> RecordService {
    RecordService::builder()
        .store(create_backend())
        .config(config)
        .build()
        .expect("Failed to build record service")
}

/// Creates an invoice with a fixed id.
pub async fn create_invoice(service: &RecordService, id: &str, amount: i64) -> Record {
    service
        .create(
            CreateRecord::new("invoice", json!({"amount": amount})).with_id(id),
            ACTOR,
        )
        .await
        .expect("Failed to create invoice")
}
