//! Inbound entry point: `send` and `health`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use crate::dispatcher::Dispatcher;
use crate::error::NotificationError;
use crate::models::Payload;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendEmailRequest {
    pub event: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub data: Option<Payload>,
}

/// Immediate dispatch outcome. Says nothing about eventual delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct NotificationGateway {
    dispatcher: Arc<Dispatcher>,
}

impl NotificationGateway {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Never fails: every error is folded into a `success: false` ack.
    pub async fn send(&self, request: SendEmailRequest) -> SendAck {
        info!(event = %request.event, to = %request.email, "Received email request");

        if let Err(e) = request.validate() {
            let err = NotificationError::Validation(e.to_string());
            error!(event = %request.event, error = %err, "Rejected email request");
            return SendAck::failed(&err);
        }

        let SendEmailRequest { event, email, data } = request;
        match self
            .dispatcher
            .dispatch_named(&event, email.clone(), data.unwrap_or_default())
            .await
        {
            Ok(_) => SendAck {
                success: true,
                message: format!("Email sent successfully for event: {event} to {email}"),
            },
            Err(err) => {
                error!(event = %event, to = %email, error = %err, "Error sending email");
                SendAck::failed(&err)
            }
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl SendAck {
    fn failed(err: &NotificationError) -> Self {
        Self {
            success: false,
            message: format!("Failed to send email: {err}"),
        }
    }
}
