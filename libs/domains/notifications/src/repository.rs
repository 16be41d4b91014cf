use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NotificationResult;
use crate::models::{
    DailyCount, DateRange, DeliveryFilter, DeliveryRecord, DeliveryStats, DeliveryStatus,
    EventCount, EventKind,
};

/// Repository trait for delivery record persistence
///
/// Every list and aggregate query excludes soft-deleted records.
/// Implementations can use different storage backends (PostgreSQL, in-memory).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Persist a freshly built record
    async fn create(&self, record: DeliveryRecord) -> NotificationResult<DeliveryRecord>;

    /// Get a record by ID
    async fn find_by_id(&self, id: Uuid) -> NotificationResult<Option<DeliveryRecord>>;

    /// Get a record by the transport's message id
    async fn find_by_message_id(
        &self,
        message_id: String,
    ) -> NotificationResult<Option<DeliveryRecord>>;

    /// Records sent to a recipient, newest first
    async fn find_by_email(&self, email: String) -> NotificationResult<Vec<DeliveryRecord>>;

    /// Records for an event kind, newest first
    async fn find_by_event(&self, event: EventKind) -> NotificationResult<Vec<DeliveryRecord>>;

    /// Records in a status, newest first
    async fn find_by_status(
        &self,
        status: DeliveryStatus,
    ) -> NotificationResult<Vec<DeliveryRecord>>;

    /// Failed, bounced and spam records, most recent failure first
    async fn find_failed(&self) -> NotificationResult<Vec<DeliveryRecord>>;

    /// Records eligible for retry at `now`, oldest failure first.
    /// `None` returns every eligible record.
    async fn find_retryable(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> NotificationResult<Vec<DeliveryRecord>>;

    /// Filtered, paginated listing, newest first
    async fn find_with_filters(
        &self,
        filter: DeliveryFilter,
    ) -> NotificationResult<Vec<DeliveryRecord>>;

    /// Write the record's mutable state if the stored version still equals
    /// `expected_version`. Returns false when another writer got there first.
    async fn update_status(
        &self,
        record: DeliveryRecord,
        expected_version: i32,
    ) -> NotificationResult<bool>;

    /// Mark a record deleted without removing it
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> NotificationResult<bool>;

    /// Remove a record permanently
    async fn hard_delete(&self, id: Uuid) -> NotificationResult<bool>;

    /// Remove every record created before the cutoff, deleted or not
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> NotificationResult<u64>;

    /// Counts per status over the records matching `filter`; pagination is ignored
    async fn stats(&self, filter: DeliveryFilter) -> NotificationResult<DeliveryStats>;

    /// Counts per event kind, most frequent first
    async fn event_stats(&self, range: DateRange) -> NotificationResult<Vec<EventCount>>;

    /// Counts per creation day since the given instant, oldest day first
    async fn daily_stats(&self, since: DateTime<Utc>) -> NotificationResult<Vec<DailyCount>>;
}

/// In-memory implementation of DeliveryRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryDeliveryRepository {
    records: Arc<RwLock<HashMap<Uuid, DeliveryRecord>>>,
}

impl InMemoryDeliveryRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored records, soft-deleted included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn collect_live<F>(&self, predicate: F) -> Vec<DeliveryRecord>
    where
        F: Fn(&DeliveryRecord) -> bool,
    {
        let records = self.records.read().await;
        let mut result: Vec<DeliveryRecord> = records
            .values()
            .filter(|r| !r.is_deleted() && predicate(r))
            .cloned()
            .collect();

        // Newest first
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn create(&self, record: DeliveryRecord) -> NotificationResult<DeliveryRecord> {
        let mut records = self.records.write().await;
        records.insert(record.id, record.clone());

        tracing::debug!(tracking_id = %record.id, "Stored delivery record");
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> NotificationResult<Option<DeliveryRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).filter(|r| !r.is_deleted()).cloned())
    }

    async fn find_by_message_id(
        &self,
        message_id: String,
    ) -> NotificationResult<Option<DeliveryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| !r.is_deleted() && r.message_id.as_deref() == Some(message_id.as_str()))
            .cloned())
    }

    async fn find_by_email(&self, email: String) -> NotificationResult<Vec<DeliveryRecord>> {
        Ok(self.collect_live(|r| r.recipient == email).await)
    }

    async fn find_by_event(&self, event: EventKind) -> NotificationResult<Vec<DeliveryRecord>> {
        Ok(self.collect_live(|r| r.event == event).await)
    }

    async fn find_by_status(
        &self,
        status: DeliveryStatus,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        Ok(self.collect_live(|r| r.status == status).await)
    }

    async fn find_failed(&self) -> NotificationResult<Vec<DeliveryRecord>> {
        let mut result = self
            .collect_live(|r| {
                matches!(
                    r.status,
                    DeliveryStatus::Failed | DeliveryStatus::Bounced | DeliveryStatus::Spam
                )
            })
            .await;
        result.sort_by(|a, b| b.failed_at.cmp(&a.failed_at));
        Ok(result)
    }

    async fn find_retryable(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        let mut result = self.collect_live(|r| r.can_retry(now)).await;
        result.sort_by(|a, b| a.failed_at.cmp(&b.failed_at));
        if let Some(limit) = limit {
            result.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(result)
    }

    async fn find_with_filters(
        &self,
        filter: DeliveryFilter,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        let result = self.collect_live(|r| filter.matches(r)).await;

        // Apply pagination
        Ok(result
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn update_status(
        &self,
        record: DeliveryRecord,
        expected_version: i32,
    ) -> NotificationResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(stored) if stored.version == expected_version && !stored.is_deleted() => {
                *stored = record;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> NotificationResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) if !record.is_deleted() => {
                record.deleted_at = Some(at);
                record.updated_at = at;
                record.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hard_delete(&self, id: Uuid) -> NotificationResult<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(&id).is_some())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> NotificationResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }

    async fn stats(&self, filter: DeliveryFilter) -> NotificationResult<DeliveryStats> {
        let live = self.collect_live(|r| filter.matches(r)).await;
        let mut stats = DeliveryStats::default();
        for record in &live {
            stats.add(record.status, 1);
        }
        Ok(stats)
    }

    async fn event_stats(&self, range: DateRange) -> NotificationResult<Vec<EventCount>> {
        let live = self.collect_live(|r| range.contains(r.created_at)).await;
        let mut counts: BTreeMap<EventKind, u64> = BTreeMap::new();
        for record in &live {
            *counts.entry(record.event).or_default() += 1;
        }

        let mut result: Vec<EventCount> = counts
            .into_iter()
            .map(|(event, count)| EventCount { event, count })
            .collect();
        result.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(result)
    }

    async fn daily_stats(&self, since: DateTime<Utc>) -> NotificationResult<Vec<DailyCount>> {
        let live = self.collect_live(|r| r.created_at >= since).await;
        let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for record in &live {
            *counts.entry(record.created_at.date_naive()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }
}
