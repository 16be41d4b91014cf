use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{deliver_tracked, pick, require_fields, tracked_input, DeliveryReceipt, EventHandler};
use crate::error::{NotificationError, NotificationResult};
use crate::mailer::Mailer;
use crate::models::{CreateTracking, EventDomain, EventKind, NotificationEvent};
use crate::repository::DeliveryRepository;
use crate::tracking::TrackingService;

/// Stock alerts and transfer confirmations for operators.
pub struct InventoryEmailHandler<R: DeliveryRepository> {
    tracking: TrackingService<R>,
    mailer: Arc<dyn Mailer>,
}

impl<R: DeliveryRepository> InventoryEmailHandler<R> {
    pub fn new(tracking: TrackingService<R>, mailer: Arc<dyn Mailer>) -> Self {
        Self { tracking, mailer }
    }

    fn required(kind: EventKind) -> &'static [&'static str] {
        match kind {
            EventKind::InventoryLow => &["product", "quantity", "location"],
            EventKind::InventoryOut => &["product", "location", "lastUpdate"],
            EventKind::InventoryTransferComplete => {
                &["product", "quantity", "fromLocation", "toLocation", "date"]
            }
            _ => &[],
        }
    }

    fn prepare(&self, event: &NotificationEvent) -> NotificationResult<CreateTracking> {
        if event.kind.domain() != EventDomain::Inventory {
            return Err(NotificationError::UnroutableEvent(event.kind.to_string()));
        }
        let required = Self::required(event.kind);
        require_fields(&event.payload, required)?;

        // The alert facts double as searchable metadata
        let context = pick(&event.payload, required);
        let metadata = context.clone();

        Ok(tracked_input(&self.tracking, event, context, metadata, None))
    }
}

#[async_trait]
impl<R: DeliveryRepository + 'static> EventHandler for InventoryEmailHandler<R> {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn can_handle(&self, kind: EventKind) -> bool {
        kind.domain() == EventDomain::Inventory
    }

    async fn send(&self, event: &NotificationEvent) -> NotificationResult<DeliveryReceipt> {
        let input = self.prepare(event)?;
        debug!(event = %event.kind, to = %event.recipient, "Sending inventory email");
        deliver_tracked(&self.tracking, self.mailer.as_ref(), input).await
    }
}
