//! Notifications Domain
//!
//! Event-driven email notifications with delivery tracking.
//!
//! # Features
//!
//! - Routing of account, inventory and reporting events to their handler
//! - A tracking record per delivery attempt, created before anything is sent
//! - Status lifecycle with provider feedback (delivered, read, bounced, spam)
//! - Exponential retry backoff and a sweep that redelivers due records
//! - Aggregate statistics and retention cleanup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │     Gateway     │  ← {event, email, data} → {success, message}
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Dispatcher    │  ← First handler whose can_handle() matches
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  EventHandler   │  ← auth / inventory / report
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐      ┌────────────────────┐
//! │ TrackingService │ ───▶ │ DeliveryRepository │  ← Postgres or in-memory
//! └────────┬────────┘      └────────────────────┘
//!          │
//! ┌────────▼────────┐
//! │     Mailer      │  ← Templates + SendGrid, SMTP, mock
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{
//!     Dispatcher, InMemoryDeliveryRepository, MockEmailProvider, NotificationGateway,
//!     SendEmailRequest, TemplateCatalog, TemplateEngine, TemplateMailer, TrackingService,
//! };
//!
//! let tracking = TrackingService::new(
//!     InMemoryDeliveryRepository::new(),
//!     Arc::new(TemplateCatalog::default()),
//! );
//! let mailer = Arc::new(TemplateMailer::new(
//!     Arc::new(MockEmailProvider::new()),
//!     Arc::new(TemplateEngine::new()?),
//! ));
//! let dispatcher = Dispatcher::with_default_handlers(tracking, mailer)?;
//! let gateway = NotificationGateway::new(Arc::new(dispatcher));
//!
//! let ack = gateway.send(request).await;
//! ```

pub mod api;
pub mod catalog;
pub mod clock;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod postgres;
pub mod providers;
pub mod repository;
pub mod retry;
pub mod templates;
pub mod tracking;

// Re-export commonly used types
pub use catalog::{SenderIdentity, TemplateCatalog, TemplateSpec};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::Dispatcher;
pub use error::{NotificationError, NotificationResult};
pub use gateway::{HealthStatus, NotificationGateway, SendAck, SendEmailRequest};
pub use handlers::{
    AuthEmailHandler, DeliveryReceipt, EventHandler, InventoryEmailHandler, ReportEmailHandler,
};
pub use mailer::{Mailer, OutgoingEmail, SentMessage, TemplateMailer};
pub use models::{
    CreateTracking, DailyCount, DateRange, DeliveryFilter, DeliveryRecord, DeliveryStats,
    DeliveryStatus, EventCount, EventDomain, EventKind, NotificationEvent, Payload, Priority,
};
pub use postgres::PgDeliveryRepository;
pub use providers::{
    EmailProvider, MockEmailProvider, SendGridConfig, SendGridProvider, SmtpConfig, SmtpProvider,
};
pub use repository::{DeliveryRepository, InMemoryDeliveryRepository};
pub use retry::{RetrySweeper, SweepReport};
pub use templates::TemplateEngine;
pub use tracking::TrackingService;
