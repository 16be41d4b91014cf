use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

use crate::{
    entity,
    error::NotificationResult,
    models::{
        DailyCount, DateRange, DeliveryFilter, DeliveryRecord, DeliveryStats, DeliveryStatus,
        EventCount, EventKind,
    },
    repository::DeliveryRepository,
};

/// PostgreSQL-backed delivery record store.
#[derive(Clone)]
pub struct PgDeliveryRepository {
    db: DatabaseConnection,
}

impl PgDeliveryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn live() -> Select<entity::Entity> {
        entity::Entity::find().filter(entity::Column::DeletedAt.is_null())
    }

    fn in_range(query: Select<entity::Entity>, range: DateRange) -> Select<entity::Entity> {
        let mut query = query;
        if let Some(start) = range.start {
            query = query.filter(entity::Column::CreatedAt.gte(start));
        }
        if let Some(end) = range.end {
            query = query.filter(entity::Column::CreatedAt.lte(end));
        }
        query
    }

    /// Live records matching every set field of `filter`, unpaginated.
    fn filtered(filter: &DeliveryFilter) -> Select<entity::Entity> {
        let mut query = Self::live();

        if let Some(email) = &filter.email {
            query = query.filter(Expr::cust_with_values(
                "recipient ILIKE $1",
                [format!("%{}%", email)],
            ));
        }
        if let Some(event) = filter.event {
            query = query.filter(entity::Column::Event.eq(event));
        }
        if let Some(status) = filter.status {
            query = query.filter(entity::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(entity::Column::Priority.eq(priority));
        }
        query = Self::in_range(
            query,
            DateRange {
                start: filter.start_date,
                end: filter.end_date,
            },
        );
        if let Some(provider) = &filter.provider {
            query = query.filter(entity::Column::Provider.eq(provider.as_str()));
        }
        if let Some(campaign) = &filter.campaign {
            query = query.filter(entity::Column::Campaign.eq(campaign.as_str()));
        }
        if let Some(segment) = &filter.segment {
            query = query.filter(entity::Column::Segment.eq(segment.as_str()));
        }
        let tags = filter.tag_list();
        if !tags.is_empty() {
            query = query.filter(Expr::cust_with_values(
                "tags @> $1",
                [serde_json::Value::from(tags)],
            ));
        }
        query
    }

    async fn list(&self, query: Select<entity::Entity>) -> NotificationResult<Vec<DeliveryRecord>> {
        let models = query.all(&self.db).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl DeliveryRepository for PgDeliveryRepository {
    async fn create(&self, record: DeliveryRecord) -> NotificationResult<DeliveryRecord> {
        let active_model: entity::ActiveModel = record.into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(tracking_id = %model.id, "Stored delivery record");
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> NotificationResult<Option<DeliveryRecord>> {
        let model = Self::live()
            .filter(entity::Column::Id.eq(id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_message_id(
        &self,
        message_id: String,
    ) -> NotificationResult<Option<DeliveryRecord>> {
        let model = Self::live()
            .filter(entity::Column::MessageId.eq(message_id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_email(&self, email: String) -> NotificationResult<Vec<DeliveryRecord>> {
        self.list(
            Self::live()
                .filter(entity::Column::Recipient.eq(email))
                .order_by_desc(entity::Column::CreatedAt),
        )
        .await
    }

    async fn find_by_event(&self, event: EventKind) -> NotificationResult<Vec<DeliveryRecord>> {
        self.list(
            Self::live()
                .filter(entity::Column::Event.eq(event))
                .order_by_desc(entity::Column::CreatedAt),
        )
        .await
    }

    async fn find_by_status(
        &self,
        status: DeliveryStatus,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        self.list(
            Self::live()
                .filter(entity::Column::Status.eq(status))
                .order_by_desc(entity::Column::CreatedAt),
        )
        .await
    }

    async fn find_failed(&self) -> NotificationResult<Vec<DeliveryRecord>> {
        self.list(
            Self::live()
                .filter(entity::Column::Status.is_in([
                    DeliveryStatus::Failed,
                    DeliveryStatus::Bounced,
                    DeliveryStatus::Spam,
                ]))
                .order_by_desc(entity::Column::FailedAt),
        )
        .await
    }

    async fn find_retryable(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        self.list(
            Self::live()
                .filter(entity::Column::Status.eq(DeliveryStatus::Failed))
                .filter(Expr::cust("retry_count < max_retries"))
                .filter(
                    Condition::any()
                        .add(entity::Column::NextRetryAt.is_null())
                        .add(entity::Column::NextRetryAt.lte(now)),
                )
                .order_by_asc(entity::Column::FailedAt)
                .limit(limit),
        )
        .await
    }

    async fn find_with_filters(
        &self,
        filter: DeliveryFilter,
    ) -> NotificationResult<Vec<DeliveryRecord>> {
        let query = Self::filtered(&filter)
            .order_by_desc(entity::Column::CreatedAt)
            .limit(filter.limit)
            .offset(filter.offset);

        self.list(query).await
    }

    async fn update_status(
        &self,
        record: DeliveryRecord,
        expected_version: i32,
    ) -> NotificationResult<bool> {
        let id = record.id;
        let result = entity::Entity::update_many()
            .set(entity::mutable_columns(record))
            .filter(entity::Column::Id.eq(id))
            .filter(entity::Column::Version.eq(expected_version))
            .filter(entity::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> NotificationResult<bool> {
        let result = entity::Entity::update_many()
            .col_expr(entity::Column::DeletedAt, Expr::value(at))
            .col_expr(entity::Column::UpdatedAt, Expr::value(at))
            .col_expr(entity::Column::Version, Expr::cust("version + 1"))
            .filter(entity::Column::Id.eq(id))
            .filter(entity::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn hard_delete(&self, id: Uuid) -> NotificationResult<bool> {
        let result = entity::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> NotificationResult<u64> {
        let result = entity::Entity::delete_many()
            .filter(entity::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn stats(&self, filter: DeliveryFilter) -> NotificationResult<DeliveryStats> {
        let rows: Vec<(DeliveryStatus, i64)> = Self::filtered(&filter)
            .select_only()
            .column(entity::Column::Status)
            .column_as(entity::Column::Id.count(), "count")
            .group_by(entity::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut stats = DeliveryStats::default();
        for (status, count) in rows {
            stats.add(status, count.max(0) as u64);
        }
        Ok(stats)
    }

    async fn event_stats(&self, range: DateRange) -> NotificationResult<Vec<EventCount>> {
        let rows: Vec<(EventKind, i64)> = Self::in_range(Self::live(), range)
            .select_only()
            .column(entity::Column::Event)
            .column_as(entity::Column::Id.count(), "count")
            .group_by(entity::Column::Event)
            .order_by_desc(Expr::cust("count"))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(event, count)| EventCount {
                event,
                count: count.max(0) as u64,
            })
            .collect())
    }

    async fn daily_stats(&self, since: DateTime<Utc>) -> NotificationResult<Vec<DailyCount>> {
        let day = || Expr::cust("DATE(created_at)");
        let rows: Vec<(NaiveDate, i64)> = Self::live()
            .filter(entity::Column::CreatedAt.gte(since))
            .select_only()
            .column_as(day(), "day")
            .column_as(entity::Column::Id.count(), "count")
            .group_by(day())
            .order_by_asc(day())
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(date, count)| DailyCount {
                date,
                count: count.max(0) as u64,
            })
            .collect())
    }
}
