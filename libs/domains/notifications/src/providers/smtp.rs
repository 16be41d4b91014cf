//! SMTP email provider implementation using lettre.
//!
//! Works against MailHog/Mailpit locally (plain, no auth) and real relays
//! with TLS and credentials.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error, info};
use uuid::Uuid;

/// SMTP configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Sender email address.
    pub from_email: String,
    /// Sender name.
    pub from_name: String,
    /// SMTP username (optional for dev servers like Mailpit).
    pub username: Option<String>,
    /// SMTP password (optional for dev servers like Mailpit).
    pub password: Option<String>,
    /// Whether to use TLS (false for local dev servers).
    pub use_tls: bool,
}

impl SmtpConfig {
    pub fn new(host: String, port: u16, from_email: String, from_name: String) -> Self {
        Self {
            host,
            port,
            from_email,
            from_name,
            username: None,
            password: None,
            use_tls: false,
        }
    }

    /// MailHog/Mailpit on localhost:1025 (default development setup).
    pub fn mailhog() -> Self {
        Self::new(
            "localhost".to_string(),
            1025,
            "no-reply@zerg.dev".to_string(),
            "Zerg Notifications".to_string(),
        )
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// Domain part of the sender address, used for generated Message-IDs.
    fn message_id_domain(&self) -> &str {
        self.from_email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("localhost")
    }
}

/// SMTP email provider.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self { transport, config })
    }

    fn build_transport(
        config: &SmtpConfig,
    ) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| {
                    NotificationError::Config(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// Build a lettre Message carrying our own Message-ID.
    fn build_message(&self, email: &EmailContent, message_id: &str) -> NotificationResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {}", e)))?;

        let to: Mailbox = if email.to_name.is_empty() {
            email.to_email.parse()
        } else {
            format!("{} <{}>", email.to_name, email.to_email).parse()
        }
        .map_err(|e| NotificationError::transport(format!("Invalid to address: {}", e), Some("EADDRESS")))?;

        let mut builder = Message::builder()
            .message_id(Some(message_id.to_string()))
            .from(from)
            .to(to)
            .subject(&email.subject);

        if let Some(reply_to) = &email.reply_to {
            let reply_to: Mailbox = reply_to.parse().map_err(|e| {
                NotificationError::transport(format!("Invalid reply-to address: {}", e), Some("EADDRESS"))
            })?;
            builder = builder.reply_to(reply_to);
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::transport(format!("Failed to build email message: {}", e), None))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.config.message_id_domain());

        debug!(
            to = %email.to_email,
            subject = %email.subject,
            host = %self.config.host,
            port = %self.config.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email, &message_id)?;

        self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to_email, error = %e, "Failed to send email via SMTP");
            NotificationError::from(e)
        })?;

        info!(to = %email.to_email, message_id = %message_id, "Email sent via SMTP");

        Ok(SentEmail {
            message_id: Some(message_id),
        })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        let ok = self.transport.test_connection().await?;
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smtp_config_mailhog() {
        let config = SmtpConfig::mailhog();
        assert_eq!(config.port, 1025);
        assert!(!config.use_tls);
        assert_eq!(config.message_id_domain(), "zerg.dev");
    }

    #[test]
    fn test_smtp_config_with_tls() {
        let config = SmtpConfig::new(
            "smtp.example.com".to_string(),
            587,
            "alerts@example.com".to_string(),
            "Alerts".to_string(),
        )
        .with_tls(true)
        .with_credentials("user".to_string(), "pass".to_string());

        assert!(config.use_tls);
        assert_eq!(config.username, Some("user".to_string()));
        assert_eq!(config.password, Some("pass".to_string()));
    }

    #[tokio::test]
    async fn test_message_carries_generated_id() {
        let provider = SmtpProvider::new(SmtpConfig::mailhog()).unwrap();
        let email = EmailContent {
            to_email: "ops@example.com".to_string(),
            subject: "Low stock alert".to_string(),
            text_body: "text".to_string(),
            html_body: "<p>html</p>".to_string(),
            ..Default::default()
        };

        let message = provider
            .build_message(&email, "<abc@zerg.dev>")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("<abc@zerg.dev>"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_transport_error() {
        let provider = SmtpProvider::new(SmtpConfig::mailhog()).unwrap();
        let email = EmailContent {
            to_email: "not an address".to_string(),
            ..Default::default()
        };

        let err = provider.build_message(&email, "<abc@zerg.dev>").unwrap_err();
        assert_eq!(err.code().as_deref(), Some("EADDRESS"));
    }
}
