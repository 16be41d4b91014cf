//! Error types for the notifications domain.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::DeliveryStatus;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Malformed or missing input that never reaches the store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The event payload lacks a field the event requires.
    #[error("Validation error: missing required field '{0}'")]
    MissingField(String),

    /// No registered handler claims the event.
    #[error("No handler registered for event: {0}")]
    UnroutableEvent(String),

    /// The mail transport (or rendering in front of it) failed.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        code: Option<String>,
    },

    /// Delivery record not found.
    #[error("Delivery record not found: {0}")]
    NotFound(Uuid),

    /// No delivery record carries the given transport message id.
    #[error("No delivery record for message id: {0}")]
    MessageNotFound(String),

    /// Delivery record is not eligible for retry right now.
    #[error("Delivery record {0} cannot be retried")]
    NotRetryable(Uuid),

    /// The requested transition is not allowed from the record's current status.
    #[error("Delivery record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// A concurrent writer changed the record between read and write.
    #[error("Delivery record {0} was modified concurrently")]
    Conflict(Uuid),

    /// Persistence layer failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Template rendering error.
    #[error("Template rendering error: {0}")]
    Template(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// Build a transport error from a message and an optional provider code.
    pub fn transport(message: impl Into<String>, code: Option<&str>) -> Self {
        NotificationError::Transport {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    /// True for payload/request validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NotificationError::Validation(_) | NotificationError::MissingField(_)
        )
    }

    /// Machine-readable code recorded on failed delivery records.
    pub fn code(&self) -> Option<String> {
        match self {
            NotificationError::Transport { code, .. } => code.clone(),
            NotificationError::Template(_) => Some("TEMPLATE".to_string()),
            _ => None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            NotificationError::Validation(_) | NotificationError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            NotificationError::UnroutableEvent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NotificationError::NotFound(_) | NotificationError::MessageNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            NotificationError::NotRetryable(_)
            | NotificationError::InvalidTransition { .. }
            | NotificationError::Conflict(_) => StatusCode::CONFLICT,
            NotificationError::Transport { .. } => StatusCode::BAD_GATEWAY,
            NotificationError::Store(_)
            | NotificationError::Template(_)
            | NotificationError::Config(_)
            | NotificationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            NotificationError::Validation(_) | NotificationError::MissingField(_) => "validation",
            NotificationError::UnroutableEvent(_) => "unroutable_event",
            NotificationError::Transport { .. } => "transport",
            NotificationError::NotFound(_) | NotificationError::MessageNotFound(_) => "not_found",
            NotificationError::NotRetryable(_) => "not_retryable",
            NotificationError::InvalidTransition { .. } => "invalid_transition",
            NotificationError::Conflict(_) => "conflict",
            NotificationError::Store(_) => "store",
            NotificationError::Template(_) => "template",
            NotificationError::Config(_) => "config",
            NotificationError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<sea_orm::DbErr> for NotificationError {
    fn from(err: sea_orm::DbErr) -> Self {
        NotificationError::Store(err.to_string())
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        let code = err.status().map(|s| s.as_u16().to_string());
        NotificationError::Transport {
            message: err.to_string(),
            code,
        }
    }
}

impl From<lettre::transport::smtp::Error> for NotificationError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        let code = err.status().map(|c| c.to_string());
        NotificationError::Transport {
            message: format!("SMTP send failed: {}", err),
            code,
        }
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_validation() {
        let err = NotificationError::MissingField("quantity".to_string());
        assert!(err.is_validation());
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_transport_code_is_recorded() {
        let err = NotificationError::transport("connection refused", Some("ECONNREFUSED"));
        assert_eq!(err.code().as_deref(), Some("ECONNREFUSED"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            NotificationError::UnroutableEvent("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            NotificationError::NotRetryable(Uuid::nil()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            NotificationError::NotFound(Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
