//! Event handlers: one per business area.
//!
//! A handler validates the payload for the event kind, picks the template,
//! and runs the tracked send: create record → mailer → mark sent/failed.

mod auth;
mod inventory;
mod report;

pub use auth::AuthEmailHandler;
pub use inventory::InventoryEmailHandler;
pub use report::ReportEmailHandler;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use crate::error::{NotificationError, NotificationResult};
use crate::mailer::{Mailer, OutgoingEmail};
use crate::models::{CreateTracking, DeliveryRecord, EventKind, NotificationEvent, Payload};
use crate::repository::DeliveryRepository;
use crate::tracking::TrackingService;

/// Outcome of a successful tracked send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub tracking_id: Uuid,
    pub message_id: Option<String>,
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and coverage reports.
    fn name(&self) -> &'static str;

    fn can_handle(&self, kind: EventKind) -> bool;

    async fn send(&self, event: &NotificationEvent) -> NotificationResult<DeliveryReceipt>;
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Absent, `null` and `""` all count as missing. `0` and `false` do not.
pub fn is_present(payload: &Payload, field: &str) -> bool {
    match payload.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Fails with `MissingField` naming the first absent field, in the given order.
pub fn require_fields(payload: &Payload, fields: &[&str]) -> NotificationResult<()> {
    match fields.iter().find(|f| !is_present(payload, f)) {
        Some(missing) => Err(NotificationError::MissingField(missing.to_string())),
        None => Ok(()),
    }
}

/// Copy the listed fields that are present.
pub(crate) fn pick(payload: &Payload, fields: &[&str]) -> Payload {
    fields
        .iter()
        .filter(|f| is_present(payload, f))
        .filter_map(|f| payload.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect()
}

/// Fill `field` with `default` unless the payload carries a value for it.
pub(crate) fn or_default(context: &mut Payload, payload: &Payload, field: &str, default: Value) {
    let value = if is_present(payload, field) {
        payload.get(field).cloned().unwrap_or(default)
    } else {
        default
    };
    context.insert(field.to_string(), value);
}

pub(crate) fn string_field(payload: &Payload, field: &str) -> Option<String> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Creation input with the catalog's subject and template for `kind`.
pub(crate) fn tracked_input<R: DeliveryRepository>(
    tracking: &TrackingService<R>,
    event: &NotificationEvent,
    context: Payload,
    metadata: Payload,
    recipient_name: Option<String>,
) -> CreateTracking {
    let spec = tracking.catalog().get(event.kind);
    CreateTracking::new(event.recipient.clone(), event.kind)
        .with_template(spec.subject, spec.template)
        .with_context(context)
        .with_metadata(metadata)
        .with_recipient_name(recipient_name)
}

// ============================================================================
// Tracked delivery
// ============================================================================

/// Create the record, send, and record the outcome.
///
/// No record exists when creation fails, so nothing is sent. A transport
/// failure is recorded on the record before it is returned.
pub async fn deliver_tracked<R: DeliveryRepository>(
    tracking: &TrackingService<R>,
    mailer: &dyn Mailer,
    input: CreateTracking,
) -> NotificationResult<DeliveryReceipt> {
    let record = tracking.create_tracking(input).await?;
    send_tracked(tracking, mailer, record).await
}

/// Send an existing PENDING record and record the outcome.
///
/// Once the transport accepts the message the call succeeds, even if the
/// SENT transition cannot be written after one retry on a version conflict.
pub async fn send_tracked<R: DeliveryRepository>(
    tracking: &TrackingService<R>,
    mailer: &dyn Mailer,
    record: DeliveryRecord,
) -> NotificationResult<DeliveryReceipt> {
    let outgoing = OutgoingEmail {
        to: record.recipient.clone(),
        to_name: record.recipient_name.clone(),
        subject: record.subject.clone(),
        template_id: record.template_id.clone(),
        context: record.render_context.clone(),
    };

    match mailer.send(outgoing).await {
        Ok(sent) => {
            let mark = || {
                tracking.mark_as_sent(
                    record.id,
                    sent.message_id.clone(),
                    Some(sent.provider.clone()),
                )
            };
            let mut outcome = mark().await;
            if matches!(outcome, Err(NotificationError::Conflict(_))) {
                outcome = mark().await;
            }

            // Accepted by the transport: the send succeeded whatever the write did.
            match outcome {
                Ok(updated) => Ok(DeliveryReceipt {
                    tracking_id: updated.id,
                    message_id: updated.message_id,
                }),
                Err(mark_err) => {
                    error!(
                        tracking_id = %record.id,
                        message_id = ?sent.message_id,
                        error = %mark_err,
                        "Email sent but its status could not be recorded"
                    );
                    Ok(DeliveryReceipt {
                        tracking_id: record.id,
                        message_id: sent.message_id,
                    })
                }
            }
        }
        Err(err) => {
            if let Err(mark_err) = tracking
                .mark_as_failed(record.id, err.to_string(), err.code())
                .await
            {
                error!(
                    tracking_id = %record.id,
                    error = %mark_err,
                    "Failed to record transport failure"
                );
            }
            Err(err)
        }
    }
}
