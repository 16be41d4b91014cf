//! Capturing email provider for tests and local runs without a mail server.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<EmailContent>,
    always_fail: bool,
    fail_next: usize,
    attempts: usize,
}

/// Mock email provider that captures sent emails.
///
/// Clones share state, so a test can keep a handle while the mailer owns another.
#[derive(Debug, Clone)]
pub struct MockEmailProvider {
    state: Arc<Mutex<MockState>>,
    failure_message: Arc<str>,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failure_message: Arc::from("Mock transport failure"),
        }
    }

    /// A provider that fails every send.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                always_fail: true,
                ..Default::default()
            })),
            failure_message: Arc::from(message.into()),
        }
    }

    /// Fail the next `count` sends, then recover.
    pub async fn fail_next(&self, count: usize) {
        self.state.lock().await.fail_next = count;
    }

    /// Stop failing.
    pub async fn recover(&self) {
        let mut state = self.state.lock().await;
        state.always_fail = false;
        state.fail_next = 0;
    }

    pub async fn sent_emails(&self) -> Vec<EmailContent> {
        self.state.lock().await.sent.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.state.lock().await.sent.len()
    }

    /// Sends attempted, successful or not.
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }

    pub async fn was_sent_to(&self, email: &str) -> bool {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .any(|e| e.to_email == email)
    }
}

impl Default for MockEmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        let mut state = self.state.lock().await;
        state.attempts += 1;

        if state.always_fail || state.fail_next > 0 {
            state.fail_next = state.fail_next.saturating_sub(1);
            return Err(NotificationError::transport(
                self.failure_message.to_string(),
                Some("EMOCK"),
            ));
        }

        state.sent.push(email.clone());
        Ok(SentEmail {
            message_id: Some(format!("mock-{}", Uuid::new_v4())),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(!self.state.lock().await.always_fail)
    }
}
