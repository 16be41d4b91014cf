//! One pass of the background retry sweep.
//!
//! The sweep only does the work. How often it runs is up to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{NotificationError, NotificationResult};
use crate::handlers::send_tracked;
use crate::mailer::Mailer;
use crate::repository::DeliveryRepository;
use crate::tracking::TrackingService;

/// Default number of records picked up per pass.
pub const DEFAULT_SWEEP_BATCH: u64 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Eligible records read from the store.
    pub examined: usize,
    /// Records reset to pending by this pass.
    pub retried: usize,
    pub sent: usize,
    pub failed: usize,
    /// Records another worker reset first, or that became ineligible.
    pub skipped: usize,
}

pub struct RetrySweeper<R: DeliveryRepository> {
    tracking: TrackingService<R>,
    mailer: Arc<dyn Mailer>,
    batch_size: u64,
}

impl<R: DeliveryRepository> RetrySweeper<R> {
    pub fn new(tracking: TrackingService<R>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            tracking,
            mailer,
            batch_size: DEFAULT_SWEEP_BATCH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Retry every eligible record in the current batch, oldest failure first.
    pub async fn sweep(&self) -> NotificationResult<SweepReport> {
        let candidates = self.tracking.get_retryable_batch(self.batch_size).await?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            let record = match self.tracking.retry_failed_email(candidate.id).await {
                Ok(record) => record,
                Err(NotificationError::NotRetryable(id) | NotificationError::NotFound(id)) => {
                    debug!(tracking_id = %id, "Record no longer retryable, skipping");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(tracking_id = %candidate.id, error = %e, "Failed to reset record for retry");
                    report.skipped += 1;
                    continue;
                }
            };
            report.retried += 1;

            match send_tracked(&self.tracking, self.mailer.as_ref(), record).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    debug!(tracking_id = %candidate.id, error = %e, "Retry attempt failed");
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                retried = report.retried,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "Retry sweep finished"
            );
        }
        Ok(report)
    }
}
