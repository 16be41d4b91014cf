use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    deliver_tracked, pick, require_fields, string_field, tracked_input, DeliveryReceipt,
    EventHandler,
};
use crate::error::{NotificationError, NotificationResult};
use crate::mailer::Mailer;
use crate::models::{CreateTracking, EventDomain, EventKind, NotificationEvent, Payload};
use crate::repository::DeliveryRepository;
use crate::tracking::TrackingService;

/// Identity/account emails: welcome, activation, password reset, deactivation.
pub struct AuthEmailHandler<R: DeliveryRepository> {
    tracking: TrackingService<R>,
    mailer: Arc<dyn Mailer>,
}

impl<R: DeliveryRepository> AuthEmailHandler<R> {
    pub fn new(tracking: TrackingService<R>, mailer: Arc<dyn Mailer>) -> Self {
        Self { tracking, mailer }
    }

    fn required(kind: EventKind) -> &'static [&'static str] {
        match kind {
            EventKind::ActivationLink => &["name", "activationLink"],
            EventKind::PasswordResetRequest => &["name", "resetLink"],
            EventKind::PasswordResetSuccess | EventKind::AccountDeactivated => &["name"],
            _ => &[],
        }
    }

    fn prepare(&self, event: &NotificationEvent) -> NotificationResult<CreateTracking> {
        if event.kind.domain() != EventDomain::Identity {
            return Err(NotificationError::UnroutableEvent(event.kind.to_string()));
        }
        let required = Self::required(event.kind);
        require_fields(&event.payload, required)?;

        let context = match event.kind {
            // Welcome mail addresses the user by email when no name is known
            EventKind::UserRegistered => {
                let mut context = pick(&event.payload, &["name"]);
                context.insert(
                    "email".to_string(),
                    serde_json::Value::String(event.recipient.clone()),
                );
                context
            }
            _ => pick(&event.payload, required),
        };

        Ok(tracked_input(
            &self.tracking,
            event,
            context,
            Payload::new(),
            string_field(&event.payload, "name"),
        ))
    }
}

#[async_trait]
impl<R: DeliveryRepository + 'static> EventHandler for AuthEmailHandler<R> {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn can_handle(&self, kind: EventKind) -> bool {
        kind.domain() == EventDomain::Identity
    }

    async fn send(&self, event: &NotificationEvent) -> NotificationResult<DeliveryReceipt> {
        let input = self.prepare(event)?;
        debug!(event = %event.kind, to = %event.recipient, "Sending auth email");
        deliver_tracked(&self.tracking, self.mailer.as_ref(), input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateCatalog;
    use crate::mailer::{MockMailer, SentMessage};
    use crate::models::DeliveryStatus;
    use crate::repository::InMemoryDeliveryRepository;
    use serde_json::json;

    type Tracking = TrackingService<InMemoryDeliveryRepository>;

    fn handler(mailer: MockMailer) -> (AuthEmailHandler<InMemoryDeliveryRepository>, Tracking) {
        let tracking = TrackingService::new(
            InMemoryDeliveryRepository::new(),
            Arc::new(TemplateCatalog::default()),
        );
        (AuthEmailHandler::new(tracking.clone(), Arc::new(mailer)), tracking)
    }

    fn event(kind: EventKind, payload: serde_json::Value) -> NotificationEvent {
        let payload = match payload {
            serde_json::Value::Object(map) => map,
            _ => Payload::new(),
        };
        NotificationEvent::new(kind, "user@example.com", payload)
    }

    #[test]
    fn test_claims_identity_events_only() {
        let (handler, _) = handler(MockMailer::new());
        assert!(handler.can_handle(EventKind::UserRegistered));
        assert!(handler.can_handle(EventKind::AccountDeactivated));
        assert!(!handler.can_handle(EventKind::InventoryLow));
        assert!(!handler.can_handle(EventKind::ReportDailySummary));
    }

    #[tokio::test]
    async fn test_activation_link_sends_with_template() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|email| {
                email.template_id == "auth/activation-account"
                    && email.context["activationLink"] == "https://zerg.dev/a/1"
                    && email.to_name.as_deref() == Some("Ana")
            })
            .times(1)
            .returning(|_| {
                Ok(SentMessage {
                    message_id: Some("msg-1".to_string()),
                    provider: "mock".to_string(),
                })
            });
        let (handler, tracking) = handler(mailer);

        let receipt = handler
            .send(&event(
                EventKind::ActivationLink,
                json!({"name": "Ana", "activationLink": "https://zerg.dev/a/1"}),
            ))
            .await
            .unwrap();

        let record = tracking.get_tracking_by_id(receipt.tracking_id).await.unwrap();
        assert_eq!(record.status, DeliveryStatus::Sent);
        assert_eq!(record.recipient_name.as_deref(), Some("Ana"));
        assert_eq!(receipt.message_id.as_deref(), Some("msg-1"));
    }

    #[tokio::test]
    async fn test_reset_request_requires_link() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();
        let (handler, tracking) = handler(mailer);

        let err = handler
            .send(&event(EventKind::PasswordResetRequest, json!({"name": "Ana"})))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::MissingField(ref f) if f == "resetLink"));
        assert!(tracking
            .get_tracking_by_email("user@example.com")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_welcome_needs_no_fields() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|email| email.context["email"] == "user@example.com")
            .times(1)
            .returning(|_| {
                Ok(SentMessage {
                    message_id: None,
                    provider: "mock".to_string(),
                })
            });
        let (handler, _) = handler(mailer);

        handler
            .send(&event(EventKind::UserRegistered, json!({})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejects_foreign_event() {
        let (handler, _) = handler(MockMailer::new());
        let err = handler
            .send(&event(EventKind::InventoryOut, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::UnroutableEvent(_)));
    }
}
