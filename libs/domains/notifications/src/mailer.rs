//! The send capability used by event handlers.
//!
//! `TemplateMailer` renders a template id through the [`TemplateEngine`] and
//! hands the result to an [`EmailProvider`]. Callers only ever see
//! `NotificationError::Transport` on failure, whatever went wrong underneath.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{NotificationError, NotificationResult};
use crate::models::Payload;
use crate::providers::{EmailContent, EmailProvider};
use crate::templates::TemplateEngine;

/// A message to send, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub template_id: String,
    pub context: Payload,
}

/// Transport acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub message_id: Option<String>,
    pub provider: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> NotificationResult<SentMessage>;
}

/// Renders templates and sends through a provider.
pub struct TemplateMailer<P: EmailProvider + ?Sized> {
    provider: Arc<P>,
    templates: Arc<TemplateEngine>,
}

impl<P: EmailProvider + ?Sized> TemplateMailer<P> {
    pub fn new(provider: Arc<P>, templates: Arc<TemplateEngine>) -> Self {
        Self {
            provider,
            templates,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

// Manual impl: P itself need not be Clone.
impl<P: EmailProvider + ?Sized> Clone for TemplateMailer<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            templates: Arc::clone(&self.templates),
        }
    }
}

fn as_transport(err: NotificationError) -> NotificationError {
    match err {
        NotificationError::Transport { .. } => err,
        other => {
            let code = other.code();
            NotificationError::Transport {
                message: other.to_string(),
                code,
            }
        }
    }
}

#[async_trait]
impl<P: EmailProvider + ?Sized + 'static> Mailer for TemplateMailer<P> {
    async fn send(&self, email: OutgoingEmail) -> NotificationResult<SentMessage> {
        let rendered = self
            .templates
            .render(&email.template_id, &email.subject, &email.context)
            .map_err(|e| {
                warn!(template = %email.template_id, error = %e, "Rendering failed");
                as_transport(e)
            })?;

        let content = EmailContent {
            to_email: email.to.clone(),
            to_name: email.to_name.clone().unwrap_or_default(),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
            reply_to: None,
        };

        debug!(to = %email.to, provider = self.provider.name(), "Handing email to provider");

        let sent = self.provider.send(&content).await.map_err(as_transport)?;

        Ok(SentMessage {
            message_id: sent.message_id,
            provider: self.provider.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmailProvider;
    use serde_json::json;

    fn mailer(provider: MockEmailProvider) -> TemplateMailer<MockEmailProvider> {
        TemplateMailer::new(Arc::new(provider), Arc::new(TemplateEngine::new().unwrap()))
    }

    fn outgoing(template_id: &str) -> OutgoingEmail {
        let context = match json!({"product": "Widget", "quantity": 2, "location": "WH1"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        OutgoingEmail {
            to: "ops@example.com".to_string(),
            to_name: None,
            subject: "Low stock alert".to_string(),
            template_id: template_id.to_string(),
            context,
        }
    }

    #[tokio::test]
    async fn test_send_renders_and_delivers() {
        let provider = MockEmailProvider::new();
        let mailer = mailer(provider.clone());

        let sent = mailer.send(outgoing("inventory/stock-low")).await.unwrap();
        assert_eq!(sent.provider, "mock");
        assert!(sent.message_id.is_some());

        let emails = provider.sent_emails().await;
        assert_eq!(emails.len(), 1);
        assert!(emails[0].text_body.contains("Widget"));
    }

    #[tokio::test]
    async fn test_render_failure_surfaces_as_transport() {
        let provider = MockEmailProvider::new();
        let mailer = mailer(provider.clone());

        let err = mailer.send(outgoing("nope/missing")).await.unwrap_err();
        assert!(matches!(err, NotificationError::Transport { .. }));
        assert_eq!(err.code().as_deref(), Some("TEMPLATE"));
        assert_eq!(provider.attempts().await, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_as_transport() {
        let mailer = mailer(MockEmailProvider::failing("relay down"));

        let err = mailer.send(outgoing("inventory/stock-low")).await.unwrap_err();
        assert!(matches!(err, NotificationError::Transport { .. }));
        assert_eq!(err.code().as_deref(), Some("EMOCK"));
    }
}
