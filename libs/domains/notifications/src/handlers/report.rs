use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{
    deliver_tracked, or_default, pick, require_fields, string_field, tracked_input,
    DeliveryReceipt, EventHandler,
};
use crate::error::{NotificationError, NotificationResult};
use crate::mailer::Mailer;
use crate::models::{CreateTracking, EventDomain, EventKind, NotificationEvent, Payload};
use crate::repository::DeliveryRepository;
use crate::tracking::TrackingService;

const DAILY_COUNTERS: &[&str] = &["sales", "purchases", "newProducts", "stockMovements", "transfers"];
const DAILY_LISTS: &[&str] = &["lowStockCount", "outOfStockCount"];
const MONTHLY_TOTALS: &[&str] = &[
    "totalSales",
    "totalPurchases",
    "newCustomers",
    "avgInventory",
    "profitability",
];

/// Scheduled and on-demand business reports.
pub struct ReportEmailHandler<R: DeliveryRepository> {
    tracking: TrackingService<R>,
    mailer: Arc<dyn Mailer>,
}

impl<R: DeliveryRepository> ReportEmailHandler<R> {
    pub fn new(tracking: TrackingService<R>, mailer: Arc<dyn Mailer>) -> Self {
        Self { tracking, mailer }
    }

    fn required(kind: EventKind) -> &'static [&'static str] {
        match kind {
            EventKind::ReportDailySummary => &["name", "date", "summary"],
            EventKind::ReportMonthlySummary => &["name", "month", "year"],
            EventKind::ReportCustomGenerated => &["name", "reportName", "reportLink"],
            _ => &[],
        }
    }

    /// Render context and metadata, with optional figures defaulted.
    fn build(kind: EventKind, payload: &Payload) -> (Payload, Payload) {
        let mut context = pick(payload, Self::required(kind));
        let mut metadata = Payload::new();

        match kind {
            EventKind::ReportDailySummary => {
                for field in DAILY_COUNTERS {
                    or_default(&mut context, payload, field, json!(0));
                    or_default(&mut metadata, payload, field, json!(0));
                }
                for field in DAILY_LISTS {
                    or_default(&mut context, payload, field, Value::Array(vec![]));
                }
            }
            EventKind::ReportMonthlySummary => {
                for field in MONTHLY_TOTALS {
                    or_default(&mut context, payload, field, json!(0));
                    or_default(&mut metadata, payload, field, json!(0));
                }
                or_default(&mut context, payload, "topProducts", Value::Array(vec![]));
                or_default(&mut context, payload, "reportLink", json!(""));
            }
            _ => {
                metadata = pick(payload, &["reportName"]);
            }
        }

        (context, metadata)
    }

    fn prepare(&self, event: &NotificationEvent) -> NotificationResult<CreateTracking> {
        if event.kind.domain() != EventDomain::Reporting {
            return Err(NotificationError::UnroutableEvent(event.kind.to_string()));
        }
        require_fields(&event.payload, Self::required(event.kind))?;

        let (context, metadata) = Self::build(event.kind, &event.payload);
        Ok(tracked_input(
            &self.tracking,
            event,
            context,
            metadata,
            string_field(&event.payload, "name"),
        ))
    }
}

#[async_trait]
impl<R: DeliveryRepository + 'static> EventHandler for ReportEmailHandler<R> {
    fn name(&self) -> &'static str {
        "report"
    }

    fn can_handle(&self, kind: EventKind) -> bool {
        kind.domain() == EventDomain::Reporting
    }

    async fn send(&self, event: &NotificationEvent) -> NotificationResult<DeliveryReceipt> {
        let input = self.prepare(event)?;
        debug!(event = %event.kind, to = %event.recipient, "Sending report email");
        deliver_tracked(&self.tracking, self.mailer.as_ref(), input).await
    }
}
