//! History, restore, vread and conflict-check tests.

#![cfg(feature = "sqlite")]

mod common;

use serde_json::json;

use helios_records::config::RecordServiceConfig;
use helios_records::core::RecordEvent;
use helios_records::error::{ErrorKind, RecordError, StorageError};
use helios_records::types::{RecordPatch, parse_etag};

use common::*;

// ============================================================================
// Helper Functions
// ============================================================================

async fn invoice_with_versions(service: &helios_records::RecordService, versions: i64) {
    create_invoice(service, "inv-1", 1).await;
    for amount in 2..=versions {
        service
            .update(
                "inv-1",
                RecordPatch::new().data(json!({"amount": amount})),
                ACTOR,
                None,
            )
            .await
            .unwrap();
    }
}

// ============================================================================
// History Tests
// ============================================================================

#[tokio::test]
async fn test_history_is_newest_first() {
    let service = create_service();
    invoice_with_versions(&service, 3).await;

    let history = service.get_history("inv-1", None, None).await.unwrap();
    let versions: Vec<u64> = history.items.iter().map(|e| e.version).collect();

    assert_eq!(versions, vec![3, 2, 1]);
    assert!(history.items[0].is_current);
    assert!(history.items[0].archived_at.is_none());
    assert!(history.items[1..].iter().all(|e| !e.is_current));
    assert_eq!(history.items[2].data, json!({"amount": 1}));
    assert_eq!(history.page_info.total, 3);
    assert_eq!(history.page_info.total_pages, 1);
}

#[tokio::test]
async fn test_history_pages() {
    let service = create_service();
    invoice_with_versions(&service, 6).await;

    let first = service.get_history("inv-1", Some(1), Some(2)).await.unwrap();
    let versions: Vec<u64> = first.items.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![6, 5, 4]);
    assert_eq!(first.page_info.total, 6);
    assert_eq!(first.page_info.total_pages, 3);
    assert!(first.page_info.has_next);
    assert!(!first.page_info.has_prev);

    let third = service.get_history("inv-1", Some(3), Some(2)).await.unwrap();
    let versions: Vec<u64> = third.items.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![1]);
    assert!(!third.page_info.has_next);
}

#[tokio::test]
async fn test_history_has_no_trailing_empty_page() {
    let service = create_service();
    invoice_with_versions(&service, 5).await;

    let second = service.get_history("inv-1", Some(2), Some(2)).await.unwrap();
    let versions: Vec<u64> = second.items.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![2, 1]);
    assert_eq!(second.page_info.total, 5);
    assert_eq!(second.page_info.total_pages, 2);
    assert!(!second.page_info.has_next);
    assert!(second.page_info.has_prev);

    let fresh = create_service();
    create_invoice(&fresh, "inv-1", 1).await;
    let only = fresh.get_history("inv-1", Some(1), Some(2)).await.unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only.page_info.total, 1);
    assert_eq!(only.page_info.total_pages, 1);
    assert!(!only.page_info.has_next);
}

#[tokio::test]
async fn test_history_page_size_is_clamped() {
    let service = create_service_with_config(RecordServiceConfig {
        default_page_size: 2,
        max_page_size: 3,
        ..Default::default()
    });
    invoice_with_versions(&service, 6).await;

    let defaulted = service.get_history("inv-1", None, None).await.unwrap();
    assert_eq!(defaulted.page_info.limit, 2);
    assert_eq!(defaulted.len(), 3);

    let clamped = service.get_history("inv-1", Some(1), Some(50)).await.unwrap();
    assert_eq!(clamped.page_info.limit, 3);
    assert_eq!(clamped.len(), 4);
}

#[tokio::test]
async fn test_history_survives_delete() {
    let service = create_service();
    invoice_with_versions(&service, 2).await;
    service.delete("inv-1", ACTOR).await.unwrap();

    let history = service.get_history("inv-1", None, None).await.unwrap();
    let versions: Vec<u64> = history.items.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![2, 2, 1]);
    assert_eq!(history.items[1].archived_by.as_deref(), Some(ACTOR));
}

#[tokio::test]
async fn test_history_unknown_record() {
    let service = create_service();
    assert_kind(
        service.get_history("missing", None, None).await,
        ErrorKind::NotFound,
    );
    assert_kind(service.list_versions("missing").await, ErrorKind::NotFound);
}

// ============================================================================
// Restore Tests
// ============================================================================

#[tokio::test]
async fn test_restore_copies_snapshot_content() {
    let (service, sink) = create_recording_service();
    invoice_with_versions(&service, 3).await;

    let restored = service.restore("inv-1", 1, "u2").await.unwrap();

    assert_active_at(&restored, 4);
    assert_eq!(restored.data, json!({"amount": 1, "currency": "USD"}));
    assert_eq!(restored.updated_by, "u2");

    // The pre-restore state is archived as version 3
    let archived = service.get_version("inv-1", 3).await.unwrap();
    assert_eq!(archived.data["amount"], json!(3));
    assert_eq!(archived.archived_by, "u2");

    assert_eq!(
        sink.events().last(),
        Some(&RecordEvent::VersionRestored {
            id: "inv-1".to_string(),
            from_version: 1,
            to_version: 4,
            actor: "u2".to_string(),
        })
    );
}

#[tokio::test]
async fn test_restore_preconditions() {
    let service = create_service();
    invoice_with_versions(&service, 2).await;

    let result = service.restore("inv-1", 2, ACTOR).await;
    assert!(matches!(
        result,
        Err(StorageError::Record(RecordError::VersionNotFound { version: 2, .. }))
    ));

    service.delete("inv-1", ACTOR).await.unwrap();
    assert_kind(service.restore("inv-1", 1, ACTOR).await, ErrorKind::NotFound);
}

// ============================================================================
// Version Read Tests
// ============================================================================

#[tokio::test]
async fn test_get_version_keeps_original_timestamps() {
    let service = create_service();
    let created = create_invoice(&service, "inv-1", 1).await;
    service
        .update("inv-1", RecordPatch::new().data(json!({"amount": 2})), "u2", None)
        .await
        .unwrap();

    let snapshot = service.get_version("inv-1", 1).await.unwrap();
    assert_eq!(snapshot.record_id, "inv-1");
    assert_eq!(snapshot.created_at, created.created_at);
    assert_eq!(snapshot.updated_at, created.updated_at);
    assert_eq!(snapshot.updated_by, ACTOR);
    assert!(snapshot.archived_at >= snapshot.updated_at);

    assert_kind(service.get_version("inv-1", 2).await, ErrorKind::NotFound);
}

// ============================================================================
// Conflict Check Tests
// ============================================================================

#[tokio::test]
async fn test_check_conflict_reports_latest_change() {
    let service = create_service();
    create_invoice(&service, "inv-1", 1).await;
    let updated = service
        .update("inv-1", RecordPatch::new().data(json!({"amount": 2})), "u2", None)
        .await
        .unwrap();

    let check = service.check_conflict("inv-1", 1).await.unwrap();
    assert!(check.has_conflict);
    assert_eq!(check.current_version, 2);
    assert_eq!(check.last_modified_by, "u2");
    assert_eq!(check.last_modified_at, updated.updated_at);

    let again = service.check_conflict("inv-1", 1).await.unwrap();
    assert_eq!(check, again);
    assert_eq!(service.get_by_id("inv-1").await.unwrap().version, 2);
}

#[tokio::test]
async fn test_etag_drives_expected_version() {
    let service = create_service();
    let created = create_invoice(&service, "inv-1", 1).await;

    let if_match = created.etag();
    assert_eq!(if_match, "W/\"1\"");

    let updated = service
        .update(
            "inv-1",
            RecordPatch::new().data(json!({"amount": 2})),
            ACTOR,
            parse_etag(&if_match),
        )
        .await
        .unwrap();
    assert!(updated.matches_etag("\"2\""));

    let stale = service
        .update(
            "inv-1",
            RecordPatch::new().data(json!({"amount": 3})),
            ACTOR,
            parse_etag(&if_match),
        )
        .await;
    assert_conflict_at(stale, 2);
}
