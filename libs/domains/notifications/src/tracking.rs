//! Delivery record lifecycle.
//!
//! `TrackingService` is the only writer of status, timestamps, retry counters
//! and error fields. Every write is a compare-and-swap on the record's
//! `version`, so concurrent transitions on the same record cannot both win.

use chrono::{Duration, NaiveTime};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::TemplateCatalog;
use crate::clock::{Clock, SystemClock};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    CreateTracking, DEFAULT_MAX_RETRIES, DailyCount, DateRange, DeliveryFilter, DeliveryRecord,
    DeliveryStats, DeliveryStatus, EventCount, EventKind,
};
use crate::repository::DeliveryRepository;

/// Window used by daily statistics when the caller gives none.
pub const DEFAULT_DAILY_WINDOW_DAYS: u32 = 30;

/// Retention applied by `cleanup_old_records` when the caller gives none.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Service layer for delivery tracking
pub struct TrackingService<R: DeliveryRepository> {
    repository: Arc<R>,
    catalog: Arc<TemplateCatalog>,
    clock: Arc<dyn Clock>,
}

// Manual impl: R itself need not be Clone.
impl<R: DeliveryRepository> Clone for TrackingService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            catalog: Arc::clone(&self.catalog),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R: DeliveryRepository> TrackingService<R> {
    pub fn new(repository: R, catalog: Arc<TemplateCatalog>) -> Self {
        Self::with_clock(Arc::new(repository), catalog, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        catalog: Arc<TemplateCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            catalog,
            clock,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a PENDING record. Template and subject default from the catalog.
    pub async fn create_tracking(&self, input: CreateTracking) -> NotificationResult<DeliveryRecord> {
        input
            .validate()
            .map_err(|e| NotificationError::Validation(e.to_string()))?;
        let recipient = input.recipient.trim().to_string();
        if recipient.is_empty() {
            return Err(NotificationError::Validation("recipient is required".to_string()));
        }
        let event = input
            .event
            .ok_or_else(|| NotificationError::Validation("event is required".to_string()))?;

        let spec = self.catalog.get(event);
        let sender = self.catalog.sender();
        let now = self.clock.now();
        let is_transactional = event.is_transactional();

        let record = DeliveryRecord {
            id: Uuid::now_v7(),
            recipient,
            recipient_name: input.recipient_name,
            event,
            status: DeliveryStatus::Pending,
            priority: input.priority.unwrap_or_default(),
            subject: input.subject.unwrap_or_else(|| spec.subject.to_string()),
            template_id: input.template_id.unwrap_or_else(|| spec.template.to_string()),
            render_context: input.context,
            metadata: input.metadata,
            sender_name: input.sender_name.unwrap_or_else(|| sender.name.clone()),
            sender_email: input.sender_email.unwrap_or_else(|| sender.email.clone()),
            message_id: None,
            external_id: None,
            provider: None,
            retry_count: 0,
            max_retries: input.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            next_retry_at: None,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            failed_at: None,
            error_message: None,
            error_code: None,
            is_transactional,
            is_marketing: !is_transactional,
            campaign: input.campaign,
            segment: input.segment,
            tags: input.tags,
            version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let record = self.repository.create(record).await?;
        info!(
            tracking_id = %record.id,
            event = %record.event,
            to = %record.recipient,
            "Created delivery record"
        );
        Ok(record)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    async fn load(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(NotificationError::NotFound(id))
    }

    /// Persist `next` if nobody wrote since `expected_version` was read.
    async fn commit(&self, next: DeliveryRecord, expected_version: i32) -> NotificationResult<DeliveryRecord> {
        let id = next.id;
        if self
            .repository
            .update_status(next.clone(), expected_version)
            .await?
        {
            Ok(next)
        } else {
            warn!(tracking_id = %id, "Lost concurrent update");
            Err(NotificationError::Conflict(id))
        }
    }

    /// PENDING → SENT. Clears error state and the retry counter.
    pub async fn mark_as_sent(
        &self,
        id: Uuid,
        message_id: Option<String>,
        provider: Option<String>,
    ) -> NotificationResult<DeliveryRecord> {
        let current = self.load(id).await?;
        if current.status != DeliveryStatus::Pending {
            return Err(NotificationError::InvalidTransition {
                id,
                from: current.status,
                to: DeliveryStatus::Sent,
            });
        }

        let mut next = current.clone();
        next.apply_sent(self.clock.now(), message_id, provider);
        let record = self.commit(next, current.version).await?;

        info!(tracking_id = %id, message_id = ?record.message_id, "Marked as sent");
        Ok(record)
    }

    /// Record a failed attempt and schedule the next retry while retries remain.
    pub async fn mark_as_failed(
        &self,
        id: Uuid,
        error_message: impl Into<String>,
        error_code: Option<String>,
    ) -> NotificationResult<DeliveryRecord> {
        let current = self.load(id).await?;
        if !current.status.accepts_failure() || current.is_permanently_failed() {
            return Err(NotificationError::InvalidTransition {
                id,
                from: current.status,
                to: DeliveryStatus::Failed,
            });
        }

        let mut next = current.clone();
        next.apply_failed(self.clock.now(), error_message.into(), error_code);
        let record = self.commit(next, current.version).await?;

        if record.is_permanently_failed() {
            warn!(
                tracking_id = %id,
                retry_count = record.retry_count,
                "Delivery permanently failed"
            );
        } else {
            info!(
                tracking_id = %id,
                retry_count = record.retry_count,
                next_retry_at = ?record.next_retry_at,
                "Marked as failed"
            );
        }
        Ok(record)
    }

    /// Provider-feedback transition: sets the status and its timestamp.
    pub async fn record_feedback(
        &self,
        id: Uuid,
        status: DeliveryStatus,
    ) -> NotificationResult<DeliveryRecord> {
        ensure_feedback_status(status)?;
        let current = self.load(id).await?;

        let mut next = current.clone();
        next.apply_feedback(status, self.clock.now());
        let record = self.commit(next, current.version).await?;

        info!(tracking_id = %id, status = %status, "Recorded delivery feedback");
        Ok(record)
    }

    pub async fn mark_as_delivered(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.record_feedback(id, DeliveryStatus::Delivered).await
    }

    pub async fn mark_as_read(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.record_feedback(id, DeliveryStatus::Read).await
    }

    pub async fn mark_as_bounced(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.record_feedback(id, DeliveryStatus::Bounced).await
    }

    pub async fn mark_as_spam(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.record_feedback(id, DeliveryStatus::Spam).await
    }

    pub async fn mark_as_unsubscribed(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.record_feedback(id, DeliveryStatus::Unsubscribed).await
    }

    /// Feedback addressed by the transport's message id (webhook callers).
    pub async fn mark_by_message_id(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> NotificationResult<DeliveryRecord> {
        ensure_feedback_status(status)?;
        let record = self
            .repository
            .find_by_message_id(message_id.to_string())
            .await?
            .ok_or_else(|| NotificationError::MessageNotFound(message_id.to_string()))?;
        self.record_feedback(record.id, status).await
    }

    /// FAILED → PENDING when the record is eligible right now.
    ///
    /// Eligibility check and reset are one compare-and-swap; a caller losing
    /// the race gets `NotRetryable`.
    pub async fn retry_failed_email(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        let current = self.load(id).await?;
        let now = self.clock.now();
        if !current.can_retry(now) {
            warn!(
                tracking_id = %id,
                status = %current.status,
                retry_count = current.retry_count,
                "Retry rejected"
            );
            return Err(NotificationError::NotRetryable(id));
        }

        let mut next = current.clone();
        next.apply_retry_reset(now);
        match self.commit(next, current.version).await {
            Ok(record) => {
                info!(tracking_id = %id, retry_count = record.retry_count, "Reset for retry");
                Ok(record)
            }
            Err(NotificationError::Conflict(_)) => Err(NotificationError::NotRetryable(id)),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every record eligible for retry now, oldest failure first.
    pub async fn get_retryable_emails(&self) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository.find_retryable(self.clock.now(), None).await
    }

    /// At most `limit` retryable records, oldest failure first.
    pub async fn get_retryable_batch(&self, limit: u64) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository
            .find_retryable(self.clock.now(), Some(limit))
            .await
    }

    pub async fn get_tracking_by_id(&self, id: Uuid) -> NotificationResult<DeliveryRecord> {
        self.load(id).await
    }

    pub async fn get_tracking_by_message_id(
        &self,
        message_id: &str,
    ) -> NotificationResult<Option<DeliveryRecord>> {
        self.repository
            .find_by_message_id(message_id.to_string())
            .await
    }

    pub async fn get_tracking_by_email(&self, email: &str) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository.find_by_email(email.to_string()).await
    }

    pub async fn get_tracking_by_event(
        &self,
        event: EventKind,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository.find_by_event(event).await
    }

    pub async fn get_tracking_by_status(
        &self,
        status: DeliveryStatus,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository.find_by_status(status).await
    }

    /// Failed, bounced and spam records, most recent failure first.
    pub async fn get_failed_emails(&self) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository.find_failed().await
    }

    pub async fn find_with_filters(
        &self,
        filter: DeliveryFilter,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        self.repository.find_with_filters(filter).await
    }

    /// Per-status counts over the records matching `filter`, ignoring its pagination.
    pub async fn get_stats(&self, filter: DeliveryFilter) -> NotificationResult<DeliveryStats> {
        self.repository.stats(filter).await
    }

    pub async fn get_event_stats(&self, range: DateRange) -> NotificationResult<Vec<EventCount>> {
        self.repository.event_stats(range).await
    }

    /// Per-day counts for the last `window_days` days, today included.
    pub async fn get_daily_stats(&self, window_days: u32) -> NotificationResult<Vec<DailyCount>> {
        let days_back = i64::from(window_days.max(1)) - 1;
        let since = (self.clock.now() - Duration::days(days_back))
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        self.repository.daily_stats(since).await
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    pub async fn soft_delete(&self, id: Uuid) -> NotificationResult<()> {
        if self.repository.soft_delete(id, self.clock.now()).await? {
            info!(tracking_id = %id, "Soft-deleted delivery record");
            Ok(())
        } else {
            Err(NotificationError::NotFound(id))
        }
    }

    /// Hard-delete records created more than `days_to_keep` days ago.
    pub async fn cleanup_old_records(&self, days_to_keep: u32) -> NotificationResult<u64> {
        let cutoff = self.clock.now() - Duration::days(i64::from(days_to_keep));
        let removed = self.repository.delete_created_before(cutoff).await?;
        if removed > 0 {
            info!(removed, %cutoff, "Cleaned up old delivery records");
        } else {
            debug!(%cutoff, "No delivery records to clean up");
        }
        Ok(removed)
    }
}

fn ensure_feedback_status(status: DeliveryStatus) -> NotificationResult<()> {
    match status {
        DeliveryStatus::Delivered
        | DeliveryStatus::Read
        | DeliveryStatus::Bounced
        | DeliveryStatus::Spam
        | DeliveryStatus::Unsubscribed => Ok(()),
        other => Err(NotificationError::Validation(format!(
            "{} is not a delivery feedback status",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{DEFAULT_MAX_RETRIES, retry_backoff};
    use crate::repository::{InMemoryDeliveryRepository, MockDeliveryRepository};
    use chrono::Utc;
    use mockall::predicate;

    fn service() -> (TrackingService<InMemoryDeliveryRepository>, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let service = TrackingService::with_clock(
            Arc::new(InMemoryDeliveryRepository::new()),
            Arc::new(TemplateCatalog::default()),
            Arc::new(clock.clone()),
        );
        (service, clock)
    }

    fn mocked(repo: MockDeliveryRepository) -> TrackingService<MockDeliveryRepository> {
        TrackingService::new(repo, Arc::new(TemplateCatalog::default()))
    }

    async fn pending(service: &TrackingService<InMemoryDeliveryRepository>) -> DeliveryRecord {
        service
            .create_tracking(CreateTracking::new("a@b.com", EventKind::InventoryLow))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_applies_catalog_defaults() {
        let (service, _) = service();
        let record = pending(&service).await;

        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.template_id, "inventory/stock-low");
        assert_eq!(record.subject, "Low stock alert");
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.max_retries, DEFAULT_MAX_RETRIES);
        assert!(record.is_transactional);
        assert!(!record.is_marketing);
    }

    #[tokio::test]
    async fn test_create_keeps_caller_template() {
        let (service, _) = service();
        let record = service
            .create_tracking(
                CreateTracking::new("a@b.com", EventKind::ReportDailySummary)
                    .with_template("Custom", "reports/custom-generated"),
            )
            .await
            .unwrap();

        assert_eq!(record.subject, "Custom");
        assert_eq!(record.template_id, "reports/custom-generated");
        assert!(!record.is_transactional);
        assert!(record.is_marketing);
    }

    #[tokio::test]
    async fn test_create_requires_recipient_and_event() {
        let repo = MockDeliveryRepository::new();
        let service = mocked(repo);

        let err = service
            .create_tracking(CreateTracking::new("   ", EventKind::InventoryLow))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = service
            .create_tracking(CreateTracking {
                recipient: "a@b.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_store_failure_on_create_is_surfaced() {
        let mut repo = MockDeliveryRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|_| Err(NotificationError::Store("connection reset".to_string())));
        let service = mocked(repo);

        let err = service
            .create_tracking(CreateTracking::new("a@b.com", EventKind::InventoryLow))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Store(_)));
    }

    #[tokio::test]
    async fn test_sent_after_failure_clears_error_state() {
        let (service, clock) = service();
        let record = pending(&service).await;

        service
            .mark_as_failed(record.id, "timeout", Some("ETIMEDOUT".into()))
            .await
            .unwrap();
        clock.advance(Duration::seconds(5));
        service.retry_failed_email(record.id).await.unwrap();

        let sent = service
            .mark_as_sent(record.id, Some("msg-1".into()), Some("mock".into()))
            .await
            .unwrap();
        assert_eq!(sent.status, DeliveryStatus::Sent);
        assert_eq!(sent.retry_count, 0);
        assert!(sent.error_message.is_none());
        assert!(sent.error_code.is_none());
        assert_eq!(sent.message_id.as_deref(), Some("msg-1"));
        assert_eq!(sent.provider.as_deref(), Some("mock"));
        assert!(sent.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_as_sent_requires_pending() {
        let (service, _) = service();
        let record = pending(&service).await;
        service.mark_as_sent(record.id, None, None).await.unwrap();
        let before = service.get_tracking_by_id(record.id).await.unwrap();

        let err = service
            .mark_as_sent(record.id, Some("again".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotificationError::InvalidTransition {
                from: DeliveryStatus::Sent,
                to: DeliveryStatus::Sent,
                ..
            }
        ));

        let after = service.get_tracking_by_id(record.id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_backoff_grows_per_failure() {
        let (service, clock) = service();
        let record = pending(&service).await;

        let failed = service.mark_as_failed(record.id, "down", None).await.unwrap();
        let failed_at = failed.failed_at.unwrap();
        assert_eq!(failed.retry_count, 1);
        assert_eq!(failed.next_retry_at.unwrap() - failed_at, retry_backoff(1));
        assert!(failed.next_retry_at.unwrap() > failed_at);

        clock.advance(Duration::seconds(1));
        let failed = service.mark_as_failed(record.id, "down", None).await.unwrap();
        assert_eq!(failed.retry_count, 2);
        assert_eq!(
            failed.next_retry_at.unwrap() - failed.failed_at.unwrap(),
            Duration::milliseconds(4_000)
        );
    }

    #[tokio::test]
    async fn test_three_failures_exhaust_retries() {
        let (service, clock) = service();
        let record = pending(&service).await;

        for _ in 0..3 {
            service.mark_as_failed(record.id, "down", None).await.unwrap();
        }

        let record = service.get_tracking_by_id(record.id).await.unwrap();
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert_eq!(record.retry_count, 3);
        assert!(record.next_retry_at.is_none());

        clock.advance(Duration::days(1));
        assert!(service.get_retryable_emails().await.unwrap().is_empty());
        assert!(matches!(
            service.retry_failed_email(record.id).await.unwrap_err(),
            NotificationError::NotRetryable(_)
        ));
    }

    #[tokio::test]
    async fn test_retry_waits_for_backoff() {
        let (service, clock) = service();
        let record = pending(&service).await;
        service.mark_as_failed(record.id, "down", None).await.unwrap();

        assert!(matches!(
            service.retry_failed_email(record.id).await.unwrap_err(),
            NotificationError::NotRetryable(_)
        ));
        assert!(service.get_retryable_emails().await.unwrap().is_empty());

        clock.advance(retry_backoff(1));
        assert_eq!(service.get_retryable_emails().await.unwrap().len(), 1);

        let reset = service.retry_failed_email(record.id).await.unwrap();
        assert_eq!(reset.status, DeliveryStatus::Pending);
        assert_eq!(reset.retry_count, 1);
        assert!(reset.error_message.is_none());
        assert!(reset.next_retry_at.is_none());
    }

    #[tokio::test]
    async fn test_retry_unknown_record_is_not_found() {
        let (service, _) = service();
        let err = service.retry_failed_email(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retry_losing_the_race_is_not_retryable() {
        let id = Uuid::now_v7();
        let mut record = {
            let (service, _) = service();
            pending(&service).await
        };
        record.id = id;
        record.status = DeliveryStatus::Failed;
        record.retry_count = 1;
        record.version = 4;

        let mut repo = MockDeliveryRepository::new();
        repo.expect_find_by_id()
            .with(predicate::eq(id))
            .times(1)
            .returning(move |_| Ok(Some(record.clone())));
        repo.expect_update_status()
            .withf(|next, expected| next.status == DeliveryStatus::Pending && *expected == 4)
            .times(1)
            .returning(|_, _| Ok(false));
        let service = mocked(repo);

        let err = service.retry_failed_email(id).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotRetryable(found) if found == id));
    }

    #[tokio::test]
    async fn test_concurrent_retries_only_one_wins() {
        let (service, clock) = service();
        let record = pending(&service).await;
        service.mark_as_failed(record.id, "down", None).await.unwrap();
        clock.advance(Duration::minutes(1));

        let (a, b) = tokio::join!(
            service.retry_failed_email(record.id),
            service.retry_failed_email(record.id)
        );
        let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_feedback_transitions() {
        let (service, _) = service();
        let record = pending(&service).await;
        service
            .mark_as_sent(record.id, Some("msg-9".into()), Some("mock".into()))
            .await
            .unwrap();

        let delivered = service.mark_as_delivered(record.id).await.unwrap();
        assert_eq!(delivered.status, DeliveryStatus::Delivered);
        assert!(delivered.delivered_at.is_some());

        let read = service
            .mark_by_message_id("msg-9", DeliveryStatus::Read)
            .await
            .unwrap();
        assert_eq!(read.status, DeliveryStatus::Read);
        assert!(read.read_at.is_some());

        let err = service
            .mark_by_message_id("msg-9", DeliveryStatus::Pending)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = service
            .mark_by_message_id("unknown", DeliveryStatus::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::MessageNotFound(_)));
    }

    #[tokio::test]
    async fn test_bounce_records_failure_time() {
        let (service, _) = service();
        let record = pending(&service).await;
        service.mark_as_sent(record.id, None, None).await.unwrap();

        let bounced = service.mark_as_bounced(record.id).await.unwrap();
        assert_eq!(bounced.status, DeliveryStatus::Bounced);
        assert!(bounced.failed_at.is_some());

        let failed = service.get_failed_emails().await.unwrap();
        assert_eq!(failed.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_after_delivery_is_recorded() {
        let (service, _) = service();
        let record = pending(&service).await;
        service.mark_as_sent(record.id, None, None).await.unwrap();
        service.mark_as_delivered(record.id).await.unwrap();

        let failed = service.mark_as_failed(record.id, "late", None).await.unwrap();
        assert_eq!(failed.status, DeliveryStatus::Failed);
        assert_eq!(failed.retry_count, 1);
        assert!(failed.next_retry_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_from_terminal_state_is_rejected() {
        let (service, _) = service();
        let read = pending(&service).await;
        service.mark_as_sent(read.id, None, None).await.unwrap();
        service.mark_as_read(read.id).await.unwrap();
        assert!(matches!(
            service.mark_as_failed(read.id, "late", None).await.unwrap_err(),
            NotificationError::InvalidTransition { from: DeliveryStatus::Read, .. }
        ));

        let exhausted = pending(&service).await;
        for _ in 0..DEFAULT_MAX_RETRIES {
            service.mark_as_failed(exhausted.id, "down", None).await.unwrap();
        }
        assert!(matches!(
            service.mark_as_failed(exhausted.id, "down", None).await.unwrap_err(),
            NotificationError::InvalidTransition { from: DeliveryStatus::Failed, .. }
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_record() {
        let (service, _) = service();
        let record = pending(&service).await;

        service.soft_delete(record.id).await.unwrap();
        assert!(service
            .find_with_filters(DeliveryFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            service.soft_delete(record.id).await.unwrap_err(),
            NotificationError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_uses_retention_cutoff() {
        let mut repo = MockDeliveryRepository::new();
        repo.expect_delete_created_before()
            .withf(|cutoff| *cutoff < Utc::now() - Duration::days(89))
            .times(1)
            .returning(|_| Ok(7));
        let service = mocked(repo);

        assert_eq!(service.cleanup_old_records(90).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_daily_stats_window_starts_at_midnight() {
        let (service, clock) = service();
        pending(&service).await;
        clock.advance(Duration::days(2));
        pending(&service).await;

        let today = service.get_daily_stats(1).await.unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].count, 1);

        let week = service.get_daily_stats(7).await.unwrap();
        assert_eq!(week.iter().map(|d| d.count).sum::<u64>(), 2);
    }
}
