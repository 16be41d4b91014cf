//! Notification Service
//!
//! Receives business events over HTTP, routes each one to the handler that
//! owns it, renders and sends the email, and tracks every delivery.
//!
//! ## Architecture
//!
//! ```text
//! POST /send
//!   ↓
//! NotificationGateway → Dispatcher
//!   ↓ (first handler claiming the event)
//! Auth / Inventory / Report handlers
//!   ↓ (tracking record + render + send)
//! TemplateMailer → EmailProvider (SendGrid/SMTP)
//!
//! JobScheduler
//!   ├─ retry sweep   → RetrySweeper::sweep
//!   └─ retention     → TrackingService::cleanup_old_records
//! ```
//!
//! ## Features
//!
//! - Postgres delivery store when `DATABASE_URL` is set, in-memory otherwise
//! - Scheduled redelivery of failed emails with exponential backoff
//! - Tracking and statistics endpoints under `/tracking`
//! - Graceful shutdown on SIGINT/SIGTERM

pub mod config;

use crate::config::{JobsConfig, NotifierConfig, ProviderConfig};
use core_config::{database::DatabaseConfig, Environment, FromEnv};
use domain_notifications::{
    api, DeliveryRepository, Dispatcher, InMemoryDeliveryRepository, Mailer,
    NotificationGateway, PgDeliveryRepository, RetrySweeper, SendGridProvider, SmtpProvider,
    TemplateCatalog, TemplateEngine, TemplateMailer, TrackingService,
};
use eyre::{Result, WrapErr};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Run the notification service
///
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Loads configuration and selects the email provider
/// 3. Connects to Postgres and applies migrations, if configured
/// 4. Serves HTTP and runs the scheduled jobs until a shutdown signal
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database or provider
/// cannot be initialized, a cron expression is rejected, or the listener
/// cannot bind.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = NotifierConfig::from_env().wrap_err("Failed to load notifier configuration")?;
    info!(
        environment = ?config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Starting notification service"
    );

    let mailer = build_mailer(&config.provider)?;
    let catalog = Arc::new(TemplateCatalog::default());

    match &config.database {
        Some(database) => {
            let db = connect(database).await?;
            let tracking = TrackingService::new(PgDeliveryRepository::new(db), catalog);
            serve(&config, tracking, mailer).await
        }
        None => {
            warn!("DATABASE_URL not set, delivery records are kept in memory only");
            let tracking = TrackingService::new(InMemoryDeliveryRepository::new(), catalog);
            serve(&config, tracking, mailer).await
        }
    }
}

fn build_mailer(provider: &ProviderConfig) -> Result<Arc<dyn Mailer>> {
    let templates =
        Arc::new(TemplateEngine::new().wrap_err("Failed to initialize template engine")?);

    let mailer: Arc<dyn Mailer> = match provider {
        ProviderConfig::SendGrid(config) => {
            info!(from = %config.from_email, "Using SendGrid provider");
            Arc::new(TemplateMailer::new(
                Arc::new(SendGridProvider::new(config.clone())),
                templates,
            ))
        }
        ProviderConfig::Smtp(config) => {
            info!(host = %config.host, port = config.port, "Using SMTP provider");
            let provider = SmtpProvider::new(config.clone()).wrap_err_with(|| {
                format!(
                    "SMTP configuration error. Ensure {}:{} is reachable",
                    config.host, config.port
                )
            })?;
            Arc::new(TemplateMailer::new(Arc::new(provider), templates))
        }
    };

    Ok(mailer)
}

async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    info!("Connected to PostgreSQL");

    Migrator::up(&db, None)
        .await
        .wrap_err("Failed to apply migrations")?;
    info!("Migrations applied");

    Ok(db)
}

async fn serve<R: DeliveryRepository + 'static>(
    config: &NotifierConfig,
    tracking: TrackingService<R>,
    mailer: Arc<dyn Mailer>,
) -> Result<()> {
    let dispatcher = Dispatcher::with_default_handlers(tracking.clone(), mailer.clone())
        .wrap_err("Handler registration is incomplete")?;
    info!(handlers = ?dispatcher.handler_names(), "Dispatcher ready");

    let gateway = NotificationGateway::new(Arc::new(dispatcher));
    let app = api::router(tracking.clone(), gateway).layer(TraceLayer::new_for_http());

    let mut scheduler = start_jobs(&config.jobs, tracking, mailer).await?;

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind to {}", address))?;
    info!(address = %address, "Notification service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("HTTP server failed")?;

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    match tokio::time::timeout(grace, scheduler.shutdown()).await {
        Ok(Ok(())) => info!("Scheduler stopped"),
        Ok(Err(e)) => error!(error = %e, "Scheduler shutdown failed"),
        Err(_) => warn!(grace_secs = grace.as_secs(), "Scheduler did not stop in time"),
    }

    info!("Notification service stopped");
    Ok(())
}

/// Schedule the retry sweep and the retention cleanup.
async fn start_jobs<R: DeliveryRepository + 'static>(
    jobs: &JobsConfig,
    tracking: TrackingService<R>,
    mailer: Arc<dyn Mailer>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .wrap_err("Failed to create job scheduler")?;

    let sweeper =
        Arc::new(RetrySweeper::new(tracking.clone(), mailer).with_batch_size(jobs.sweep_batch));
    let sweep_job = Job::new_async(jobs.retry_sweep_cron.as_str(), move |_uuid, _l| {
        let sweeper = sweeper.clone();

        Box::pin(async move {
            match sweeper.sweep().await {
                Ok(report) if report.examined > 0 => info!(
                    examined = report.examined,
                    sent = report.sent,
                    failed = report.failed,
                    skipped = report.skipped,
                    "Retry sweep complete"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Retry sweep failed"),
            }
        })
    })
    .wrap_err_with(|| format!("Invalid retry sweep cron: {}", jobs.retry_sweep_cron))?;

    let retention_days = jobs.retention_days;
    let cleanup_job = Job::new_async(jobs.cleanup_cron.as_str(), move |_uuid, _l| {
        let tracking = tracking.clone();

        Box::pin(async move {
            match tracking.cleanup_old_records(retention_days).await {
                Ok(removed) => info!(removed, retention_days, "Retention cleanup complete"),
                Err(e) => error!(error = %e, "Retention cleanup failed"),
            }
        })
    })
    .wrap_err_with(|| format!("Invalid cleanup cron: {}", jobs.cleanup_cron))?;

    scheduler.add(sweep_job).await.wrap_err("Failed to add retry sweep job")?;
    scheduler.add(cleanup_job).await.wrap_err("Failed to add cleanup job")?;
    scheduler.start().await.wrap_err("Failed to start job scheduler")?;

    info!(
        retry_sweep = %jobs.retry_sweep_cron,
        cleanup = %jobs.cleanup_cron,
        "Scheduled jobs started"
    );

    Ok(scheduler)
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}
