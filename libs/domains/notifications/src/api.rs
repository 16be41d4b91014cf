//! HTTP surface for the notifier.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{NotificationError, NotificationResult};
use crate::gateway::{HealthStatus, NotificationGateway, SendAck, SendEmailRequest};
use crate::models::{
    DailyCount, DateRange, DeliveryFilter, DeliveryRecord, DeliveryStats, DeliveryStatus,
    EventCount,
};
use crate::repository::DeliveryRepository;
use crate::tracking::{TrackingService, DEFAULT_DAILY_WINDOW_DAYS};

pub struct ApiState<R: DeliveryRepository> {
    pub tracking: TrackingService<R>,
    pub gateway: NotificationGateway,
}

type SharedState<R> = Arc<ApiState<R>>;

#[derive(Debug, Deserialize)]
pub struct DailyStatsQuery {
    pub days: Option<u32>,
}

/// Build the router for the send, health and tracking endpoints.
pub fn router<R: DeliveryRepository + 'static>(
    tracking: TrackingService<R>,
    gateway: NotificationGateway,
) -> Router {
    let state = Arc::new(ApiState { tracking, gateway });

    Router::new()
        .route("/send", post(send::<R>))
        .route("/health", get(health::<R>))
        .route("/tracking", get(list_tracking::<R>))
        .route("/tracking/stats", get(stats::<R>))
        .route("/tracking/stats/events", get(event_stats::<R>))
        .route("/tracking/stats/daily", get(daily_stats::<R>))
        .route("/tracking/retryable", get(retryable::<R>))
        .route(
            "/tracking/{id}",
            get(get_tracking::<R>).delete(delete_tracking::<R>),
        )
        .route("/tracking/{id}/retry", post(retry_tracking::<R>))
        .route("/tracking/{id}/{status}", post(record_feedback::<R>))
        .with_state(state)
}

/// Always 200; the ack carries success or failure.
async fn send<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Json(request): Json<SendEmailRequest>,
) -> Json<SendAck> {
    Json(state.gateway.send(request).await)
}

async fn health<R: DeliveryRepository>(State(state): State<SharedState<R>>) -> Json<HealthStatus> {
    Json(state.gateway.health())
}

async fn list_tracking<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Query(filter): Query<DeliveryFilter>,
) -> NotificationResult<Json<Vec<DeliveryRecord>>> {
    Ok(Json(state.tracking.find_with_filters(filter).await?))
}

async fn get_tracking<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Path(id): Path<Uuid>,
) -> NotificationResult<Json<DeliveryRecord>> {
    Ok(Json(state.tracking.get_tracking_by_id(id).await?))
}

async fn delete_tracking<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Path(id): Path<Uuid>,
) -> NotificationResult<impl IntoResponse> {
    state.tracking.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn retry_tracking<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Path(id): Path<Uuid>,
) -> NotificationResult<Json<DeliveryRecord>> {
    Ok(Json(state.tracking.retry_failed_email(id).await?))
}

async fn record_feedback<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Path((id, status)): Path<(Uuid, String)>,
) -> NotificationResult<Json<DeliveryRecord>> {
    let status = DeliveryStatus::from_str(&status)
        .map_err(|_| NotificationError::Validation(format!("Unknown status: {status}")))?;
    Ok(Json(state.tracking.record_feedback(id, status).await?))
}

async fn stats<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Query(filter): Query<DeliveryFilter>,
) -> NotificationResult<Json<DeliveryStats>> {
    Ok(Json(state.tracking.get_stats(filter).await?))
}

async fn event_stats<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Query(range): Query<DateRange>,
) -> NotificationResult<Json<Vec<EventCount>>> {
    Ok(Json(state.tracking.get_event_stats(range).await?))
}

async fn daily_stats<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
    Query(query): Query<DailyStatsQuery>,
) -> NotificationResult<Json<Vec<DailyCount>>> {
    let days = query.days.unwrap_or(DEFAULT_DAILY_WINDOW_DAYS);
    Ok(Json(state.tracking.get_daily_stats(days).await?))
}

async fn retryable<R: DeliveryRepository>(
    State(state): State<SharedState<R>>,
) -> NotificationResult<Json<Vec<DeliveryRecord>>> {
    Ok(Json(state.tracking.get_retryable_emails().await?))
}
