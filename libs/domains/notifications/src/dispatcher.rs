//! Event → handler routing.
//!
//! Handlers are tried in registration order and the first one whose
//! `can_handle` accepts the event kind wins. Exhaustiveness is checked once
//! at startup with [`Dispatcher::check_coverage`]; at request time an
//! unclaimed kind is reported as `UnroutableEvent`.

use std::str::FromStr;
use std::sync::Arc;

use sea_orm::Iterable;
use tracing::{info, warn};

use crate::error::{NotificationError, NotificationResult};
use crate::handlers::{
    AuthEmailHandler, DeliveryReceipt, EventHandler, InventoryEmailHandler, ReportEmailHandler,
};
use crate::mailer::Mailer;
use crate::models::{EventKind, NotificationEvent, Payload};
use crate::repository::DeliveryRepository;
use crate::tracking::TrackingService;

#[derive(Default, Clone)]
pub struct Dispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the auth, inventory and report handlers and verifies that
    /// every event kind is routed.
    pub fn with_default_handlers<R: DeliveryRepository + 'static>(
        tracking: TrackingService<R>,
        mailer: Arc<dyn Mailer>,
    ) -> NotificationResult<Self> {
        let mut dispatcher = Self::new();
        dispatcher
            .register_handler(Arc::new(AuthEmailHandler::new(
                tracking.clone(),
                mailer.clone(),
            )))
            .register_handler(Arc::new(InventoryEmailHandler::new(
                tracking.clone(),
                mailer.clone(),
            )))
            .register_handler(Arc::new(ReportEmailHandler::new(tracking, mailer)));

        dispatcher.check_coverage()?;
        Ok(dispatcher)
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Every event kind must be claimed by exactly one handler.
    pub fn check_coverage(&self) -> NotificationResult<()> {
        let mut unclaimed = Vec::new();
        let mut contested = Vec::new();

        for kind in EventKind::iter() {
            let claimants: Vec<&str> = self
                .handlers
                .iter()
                .filter(|h| h.can_handle(kind))
                .map(|h| h.name())
                .collect();

            match claimants.len() {
                0 => unclaimed.push(kind.to_string()),
                1 => {}
                _ => contested.push(format!("{} ({})", kind, claimants.join(", "))),
            }
        }

        if unclaimed.is_empty() && contested.is_empty() {
            return Ok(());
        }

        let mut problems = Vec::new();
        if !unclaimed.is_empty() {
            problems.push(format!("no handler for: {}", unclaimed.join(", ")));
        }
        if !contested.is_empty() {
            problems.push(format!("claimed more than once: {}", contested.join("; ")));
        }
        Err(NotificationError::Config(format!(
            "Incomplete event routing, {}",
            problems.join("; ")
        )))
    }

    fn route(&self, kind: EventKind) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.iter().find(|h| h.can_handle(kind))
    }

    /// Route the event to its handler and return the handler's outcome
    /// unchanged.
    pub async fn dispatch(&self, event: NotificationEvent) -> NotificationResult<DeliveryReceipt> {
        let Some(handler) = self.route(event.kind) else {
            warn!(event = %event.kind, to = %event.recipient, "No handler registered for event");
            return Err(NotificationError::UnroutableEvent(event.kind.to_string()));
        };

        match handler.send(&event).await {
            Ok(receipt) => {
                info!(
                    event = %event.kind,
                    handler = handler.name(),
                    to = %event.recipient,
                    tracking_id = %receipt.tracking_id,
                    "Notification dispatched"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(
                    event = %event.kind,
                    handler = handler.name(),
                    to = %event.recipient,
                    error = %e,
                    "Notification dispatch failed"
                );
                Err(e)
            }
        }
    }

    /// Dispatch by wire name. Unknown names are `UnroutableEvent`.
    pub async fn dispatch_named(
        &self,
        event: &str,
        recipient: impl Into<String>,
        payload: Payload,
    ) -> NotificationResult<DeliveryReceipt> {
        let kind = EventKind::from_str(event).map_err(|_| {
            warn!(event = %event, "Unknown event name");
            NotificationError::UnroutableEvent(event.to_string())
        })?;
        self.dispatch(NotificationEvent::new(kind, recipient, payload))
            .await
    }
}
