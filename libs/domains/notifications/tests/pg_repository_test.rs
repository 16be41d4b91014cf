//! Integration tests for the Postgres delivery store
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - Enum and JSONB columns round-trip through sea-orm
//! - Version-guarded updates reject stale writers
//! - Filters, soft delete and aggregates behave like the in-memory store
//!
//! Run with `cargo test -- --ignored` on a machine with Docker.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domain_notifications::*;
use serde_json::json;
use test_utils::{assertions::*, TestDataBuilder, TestDatabase};

fn service(db: &TestDatabase) -> TrackingService<PgDeliveryRepository> {
    TrackingService::new(
        PgDeliveryRepository::new(db.connection()),
        Arc::new(TemplateCatalog::default()),
    )
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_create_and_find_record() {
    let db = TestDatabase::new().await;
    let tracking = service(&db);
    let builder = TestDataBuilder::from_test_name("pg_create_find");
    let recipient = builder.recipient("ops");

    let mut context = Payload::new();
    context.insert("product".to_string(), json!("Widget"));
    context.insert("quantity".to_string(), json!(0));

    let created = tracking
        .create_tracking(
            CreateTracking::new(recipient.clone(), EventKind::InventoryLow).with_context(context),
        )
        .await
        .unwrap();

    let found = tracking.get_tracking_by_id(created.id).await.unwrap();
    assert_uuid_eq(found.id, created.id, "record id");
    assert_eq!(found.event, EventKind::InventoryLow);
    assert_eq!(found.status, DeliveryStatus::Pending);
    assert_eq!(found.template_id, "inventory/stock-low");
    assert_eq!(found.render_context["quantity"], json!(0));
    assert_eq!(found.version, 0);

    let sent = tracking
        .mark_as_sent(created.id, Some(builder.name("msg", "1")), Some("smtp".to_string()))
        .await
        .unwrap();
    assert_eq!(sent.version, 1);

    let by_message = tracking
        .get_tracking_by_message_id(&builder.name("msg", "1"))
        .await
        .unwrap();
    let by_message = assert_some(by_message, "record by message id");
    assert_eq!(by_message.status, DeliveryStatus::Sent);
    assert_eq!(by_message.provider.as_deref(), Some("smtp"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_stale_version_is_rejected() {
    let db = TestDatabase::new().await;
    let repo = PgDeliveryRepository::new(db.connection());
    let tracking = service(&db);
    let builder = TestDataBuilder::from_test_name("pg_stale_version");

    let record = tracking
        .create_tracking(CreateTracking::new(builder.recipient("a"), EventKind::InventoryOut))
        .await
        .unwrap();

    let mut first = record.clone();
    first.status = DeliveryStatus::Sent;
    first.version += 1;
    assert!(repo.update_status(first, record.version).await.unwrap());

    let mut second = record.clone();
    second.status = DeliveryStatus::Failed;
    second.version += 1;
    assert!(!repo.update_status(second, record.version).await.unwrap());

    let stored = tracking.get_tracking_by_id(record.id).await.unwrap();
    assert_eq!(stored.status, DeliveryStatus::Sent);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_filters_and_soft_delete() {
    let db = TestDatabase::new().await;
    let tracking = service(&db);
    let builder = TestDataBuilder::from_test_name("pg_filters");

    let tagged = tracking
        .create_tracking(CreateTracking {
            tags: vec!["ops".to_string(), "eu".to_string()],
            campaign: Some(builder.name("campaign", "spring")),
            ..CreateTracking::new(builder.recipient("Ops.Team"), EventKind::InventoryLow)
        })
        .await
        .unwrap();
    let other = tracking
        .create_tracking(CreateTracking::new(builder.recipient("sales"), EventKind::ReportDailySummary))
        .await
        .unwrap();

    let filter = DeliveryFilter {
        email: Some("ops.team".to_string()),
        tags: Some("ops, eu".to_string()),
        ..Default::default()
    };
    let found = tracking.find_with_filters(filter.clone()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_uuid_eq(found[0].id, tagged.id, "filtered record");

    let by_campaign = tracking
        .find_with_filters(DeliveryFilter {
            campaign: Some(builder.name("campaign", "spring")),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_campaign.len(), 1);

    tracking.soft_delete(tagged.id).await.unwrap();
    assert!(tracking.find_with_filters(filter).await.unwrap().is_empty());
    assert!(matches!(
        tracking.get_tracking_by_id(tagged.id).await,
        Err(NotificationError::NotFound(_))
    ));

    let all = tracking.find_with_filters(DeliveryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_uuid_eq(all[0].id, other.id, "remaining record");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_retryable_query_and_stats() {
    let db = TestDatabase::new().await;
    let tracking = service(&db);
    let builder = TestDataBuilder::from_test_name("pg_retryable");

    let exhausted = tracking
        .create_tracking(
            CreateTracking::new(builder.recipient("x"), EventKind::InventoryLow).with_max_retries(1),
        )
        .await
        .unwrap();
    tracking
        .mark_as_failed(exhausted.id, "mailbox full", Some("552".to_string()))
        .await
        .unwrap();

    let pending = tracking
        .create_tracking(CreateTracking::new(builder.recipient("y"), EventKind::InventoryLow))
        .await
        .unwrap();

    // Exhausted records are never retryable; pending ones are not failed
    assert!(tracking.get_retryable_emails().await.unwrap().is_empty());

    let failed = tracking.get_failed_emails().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_uuid_eq(failed[0].id, exhausted.id, "failed record");

    let stats = tracking.get_stats(DeliveryFilter::default()).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 1);

    let events = tracking.get_event_stats(DateRange::default()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].count, 2);

    let daily = tracking.get_daily_stats(1).await.unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].count, 2);

    let cutoff = Utc::now() + Duration::days(1);
    let repo = PgDeliveryRepository::new(db.connection());
    assert_eq!(repo.delete_created_before(cutoff).await.unwrap(), 2);
    assert!(repo.find_by_id(pending.id).await.unwrap().is_none());
}
