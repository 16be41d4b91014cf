//! Data models for the notifications domain.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Arbitrary key/value map carried by events, render contexts and metadata.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Upper bound for the retry backoff delay (5 minutes).
pub const MAX_RETRY_BACKOFF_MS: u64 = 300_000;

/// Base unit of the retry backoff (1 second).
pub const BASE_RETRY_BACKOFF_MS: u64 = 1_000;

/// Default number of automatic retries per delivery record.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

// ============================================================================
// Enums
// ============================================================================

/// Why a notification is being sent.
///
/// The wire names are the dotted names published by the upstream services;
/// the descriptive dashed names are accepted as aliases.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(64))")]
pub enum EventKind {
    #[serde(rename = "user.registered", alias = "user-registered")]
    #[strum(to_string = "user.registered", serialize = "user-registered")]
    #[sea_orm(string_value = "user.registered")]
    UserRegistered,
    #[serde(rename = "user.verify", alias = "activation-link")]
    #[strum(to_string = "user.verify", serialize = "activation-link")]
    #[sea_orm(string_value = "user.verify")]
    ActivationLink,
    #[serde(rename = "user.req.reset", alias = "password-reset-request")]
    #[strum(to_string = "user.req.reset", serialize = "password-reset-request")]
    #[sea_orm(string_value = "user.req.reset")]
    PasswordResetRequest,
    #[serde(rename = "user.reset.password.success", alias = "password-reset-success")]
    #[strum(to_string = "user.reset.password.success", serialize = "password-reset-success")]
    #[sea_orm(string_value = "user.reset.password.success")]
    PasswordResetSuccess,
    #[serde(rename = "user.account.deactivated", alias = "account-deactivated")]
    #[strum(to_string = "user.account.deactivated", serialize = "account-deactivated")]
    #[sea_orm(string_value = "user.account.deactivated")]
    AccountDeactivated,
    #[serde(rename = "inventory.low", alias = "inventory-low")]
    #[strum(to_string = "inventory.low", serialize = "inventory-low")]
    #[sea_orm(string_value = "inventory.low")]
    InventoryLow,
    #[serde(rename = "inventory.out", alias = "inventory-out")]
    #[strum(to_string = "inventory.out", serialize = "inventory-out")]
    #[sea_orm(string_value = "inventory.out")]
    InventoryOut,
    #[serde(rename = "inventory.transfer.complete", alias = "inventory-transfer-complete")]
    #[strum(to_string = "inventory.transfer.complete", serialize = "inventory-transfer-complete")]
    #[sea_orm(string_value = "inventory.transfer.complete")]
    InventoryTransferComplete,
    #[serde(rename = "report.daily.summary", alias = "report-daily-summary")]
    #[strum(to_string = "report.daily.summary", serialize = "report-daily-summary")]
    #[sea_orm(string_value = "report.daily.summary")]
    ReportDailySummary,
    #[serde(rename = "report.monthly.summary", alias = "report-monthly-summary")]
    #[strum(to_string = "report.monthly.summary", serialize = "report-monthly-summary")]
    #[sea_orm(string_value = "report.monthly.summary")]
    ReportMonthlySummary,
    #[serde(rename = "report.custom.generated", alias = "report-custom-generated")]
    #[strum(to_string = "report.custom.generated", serialize = "report-custom-generated")]
    #[sea_orm(string_value = "report.custom.generated")]
    ReportCustomGenerated,
}

/// Business area an event belongs to. Each area has exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum EventDomain {
    Identity,
    Inventory,
    Reporting,
}

impl EventKind {
    /// The business area that owns this event.
    pub fn domain(&self) -> EventDomain {
        match self {
            EventKind::UserRegistered
            | EventKind::ActivationLink
            | EventKind::PasswordResetRequest
            | EventKind::PasswordResetSuccess
            | EventKind::AccountDeactivated => EventDomain::Identity,
            EventKind::InventoryLow
            | EventKind::InventoryOut
            | EventKind::InventoryTransferComplete => EventDomain::Inventory,
            EventKind::ReportDailySummary
            | EventKind::ReportMonthlySummary
            | EventKind::ReportCustomGenerated => EventDomain::Reporting,
        }
    }

    /// Identity and inventory events are transactional; reports are not.
    pub fn is_transactional(&self) -> bool {
        matches!(
            self.domain(),
            EventDomain::Identity | EventDomain::Inventory
        )
    }
}

/// Lifecycle status of a delivery record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
    /// Created, not yet handed to the transport.
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted by the transport.
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Provider confirmed delivery to the mailbox.
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Recipient opened the message.
    #[sea_orm(string_value = "read")]
    Read,
    /// Transport rejected the attempt.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Mailbox bounced the message.
    #[sea_orm(string_value = "bounced")]
    Bounced,
    /// Recipient flagged the message as spam.
    #[sea_orm(string_value = "spam")]
    Spam,
    /// Recipient opted out.
    #[sea_orm(string_value = "unsubscribed")]
    Unsubscribed,
}

impl DeliveryStatus {
    /// Statuses the core never moves out of on its own.
    ///
    /// `Failed` is terminal only once retries are exhausted, which depends on
    /// the record; see [`DeliveryRecord::is_permanently_failed`].
    pub fn is_terminal_for_automation(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Read
                | DeliveryStatus::Bounced
                | DeliveryStatus::Spam
                | DeliveryStatus::Unsubscribed
        )
    }

    /// Statuses from which a failed attempt may still be recorded.
    pub fn accepts_failure(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Pending
                | DeliveryStatus::Sent
                | DeliveryStatus::Delivered
                | DeliveryStatus::Failed
        )
    }
}

/// Delivery priority.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

// ============================================================================
// Inbound event
// ============================================================================

/// A typed inbound notification request, as routed by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub recipient: String,
    #[serde(default)]
    pub payload: Payload,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, recipient: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind,
            recipient: recipient.into(),
            payload,
        }
    }
}

// ============================================================================
// Delivery record
// ============================================================================

/// Exponential retry delay after the given number of failures.
///
/// `min(1000 * 2^retry_count, 300000)` milliseconds.
pub fn retry_backoff(retry_count: u32) -> Duration {
    let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
    let millis = BASE_RETRY_BACKOFF_MS
        .saturating_mul(factor)
        .min(MAX_RETRY_BACKOFF_MS);
    Duration::milliseconds(millis as i64)
}

/// One send attempt and its full lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub recipient: String,
    pub recipient_name: Option<String>,
    pub event: EventKind,
    pub status: DeliveryStatus,
    pub priority: Priority,
    pub subject: String,
    pub template_id: String,
    pub render_context: Payload,
    pub metadata: Payload,
    pub sender_name: String,
    pub sender_email: String,
    pub message_id: Option<String>,
    pub external_id: Option<String>,
    pub provider: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub is_transactional: bool,
    pub is_marketing: bool,
    pub campaign: Option<String>,
    pub segment: Option<String>,
    pub tags: Vec<String>,
    /// Optimistic-concurrency counter, bumped on every write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DeliveryRecord {
    /// Failed with retries left.
    pub fn is_retryable(&self) -> bool {
        self.status == DeliveryStatus::Failed && self.retry_count < self.max_retries
    }

    /// Retryable and past its backoff window.
    pub fn can_retry(&self, now: DateTime<Utc>) -> bool {
        self.is_retryable() && self.next_retry_at.is_none_or(|at| now >= at)
    }

    /// Failed with no retries left.
    pub fn is_permanently_failed(&self) -> bool {
        self.status == DeliveryStatus::Failed && self.retry_count >= self.max_retries
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }

    pub(crate) fn apply_sent(
        &mut self,
        now: DateTime<Utc>,
        message_id: Option<String>,
        provider: Option<String>,
    ) {
        self.status = DeliveryStatus::Sent;
        self.sent_at = Some(now);
        self.error_message = None;
        self.error_code = None;
        self.next_retry_at = None;
        self.retry_count = 0;
        if message_id.is_some() {
            self.external_id = message_id.clone();
            self.message_id = message_id;
        }
        if provider.is_some() {
            self.provider = provider;
        }
        self.touch(now);
    }

    pub(crate) fn apply_failed(
        &mut self,
        now: DateTime<Utc>,
        error_message: String,
        error_code: Option<String>,
    ) {
        self.status = DeliveryStatus::Failed;
        self.failed_at = Some(now);
        self.error_message = Some(error_message);
        self.error_code = error_code;
        self.retry_count = self.retry_count.saturating_add(1);
        self.next_retry_at = if self.retry_count < self.max_retries {
            Some(now + retry_backoff(self.retry_count))
        } else {
            None
        };
        self.touch(now);
    }

    pub(crate) fn apply_retry_reset(&mut self, now: DateTime<Utc>) {
        self.status = DeliveryStatus::Pending;
        self.error_message = None;
        self.error_code = None;
        self.next_retry_at = None;
        self.touch(now);
    }

    /// Provider-feedback transitions (delivered/read/bounced/spam/unsubscribed).
    pub(crate) fn apply_feedback(&mut self, status: DeliveryStatus, now: DateTime<Utc>) {
        self.status = status;
        match status {
            DeliveryStatus::Delivered => self.delivered_at = Some(now),
            DeliveryStatus::Read => self.read_at = Some(now),
            DeliveryStatus::Bounced | DeliveryStatus::Spam => self.failed_at = Some(now),
            _ => {}
        }
        self.next_retry_at = None;
        self.touch(now);
    }
}

/// Creation-time input for a delivery record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateTracking {
    #[validate(length(min = 1, message = "recipient is required"))]
    pub recipient: String,
    pub event: Option<EventKind>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub subject: Option<String>,
    pub template_id: Option<String>,
    #[serde(default)]
    pub context: Payload,
    #[serde(default)]
    pub metadata: Payload,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub campaign: Option<String>,
    pub segment: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub max_retries: Option<u32>,
}

impl CreateTracking {
    pub fn new(recipient: impl Into<String>, event: EventKind) -> Self {
        Self {
            recipient: recipient.into(),
            event: Some(event),
            ..Default::default()
        }
    }

    pub fn with_template(mut self, subject: impl Into<String>, template_id: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self.template_id = Some(template_id.into());
        self
    }

    pub fn with_context(mut self, context: Payload) -> Self {
        self.context = context;
        self
    }

    pub fn with_metadata(mut self, metadata: Payload) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_recipient_name(mut self, name: Option<String>) -> Self {
        self.recipient_name = name;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

// ============================================================================
// Queries and aggregates
// ============================================================================

/// Query filters for listing delivery records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFilter {
    /// Case-insensitive substring match on the recipient address.
    pub email: Option<String>,
    pub event: Option<EventKind>,
    pub status: Option<DeliveryStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub provider: Option<String>,
    pub campaign: Option<String>,
    pub segment: Option<String>,
    /// Comma-separated; a record must carry every listed tag.
    pub tags: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for DeliveryFilter {
    fn default() -> Self {
        Self {
            email: None,
            event: None,
            status: None,
            priority: None,
            start_date: None,
            end_date: None,
            provider: None,
            campaign: None,
            segment: None,
            tags: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl DeliveryFilter {
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a record satisfies every set filter. Soft-deleted records never match.
    pub fn matches(&self, record: &DeliveryRecord) -> bool {
        if record.is_deleted() {
            return false;
        }
        if let Some(email) = &self.email {
            if !record
                .recipient
                .to_lowercase()
                .contains(&email.to_lowercase())
            {
                return false;
            }
        }
        if self.event.is_some_and(|e| e != record.event) {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != record.priority) {
            return false;
        }
        if self.start_date.is_some_and(|d| record.created_at < d) {
            return false;
        }
        if self.end_date.is_some_and(|d| record.created_at > d) {
            return false;
        }
        if self.provider.is_some() && self.provider != record.provider {
            return false;
        }
        if self.campaign.is_some() && self.campaign != record.campaign {
            return false;
        }
        if self.segment.is_some() && self.segment != record.segment {
            return false;
        }
        self.tag_list().iter().all(|t| record.tags.contains(t))
    }
}

/// Inclusive creation-time window for aggregate queries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at <= e)
    }
}

/// Counts of delivery records per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub total: u64,
    pub pending: u64,
    pub sent: u64,
    pub delivered: u64,
    pub read: u64,
    pub failed: u64,
    pub bounced: u64,
    pub spam: u64,
    pub unsubscribed: u64,
}

impl DeliveryStats {
    pub fn add(&mut self, status: DeliveryStatus, count: u64) {
        self.total += count;
        let slot = match status {
            DeliveryStatus::Pending => &mut self.pending,
            DeliveryStatus::Sent => &mut self.sent,
            DeliveryStatus::Delivered => &mut self.delivered,
            DeliveryStatus::Read => &mut self.read,
            DeliveryStatus::Failed => &mut self.failed,
            DeliveryStatus::Bounced => &mut self.bounced,
            DeliveryStatus::Spam => &mut self.spam,
            DeliveryStatus::Unsubscribed => &mut self.unsubscribed,
        };
        *slot += count;
    }

    /// Share of records that reached the mailbox (delivered or read).
    pub fn delivery_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.delivered + self.read) as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub event: EventKind,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use sea_orm::Iterable;

    fn failed_record(retry_count: u32, next_retry_at: Option<DateTime<Utc>>) -> DeliveryRecord {
        let now = Utc::now();
        DeliveryRecord {
            id: Uuid::now_v7(),
            recipient: "a@b.com".to_string(),
            recipient_name: None,
            event: EventKind::InventoryLow,
            status: DeliveryStatus::Failed,
            priority: Priority::Normal,
            subject: "s".to_string(),
            template_id: "inventory/stock-low".to_string(),
            render_context: Payload::new(),
            metadata: Payload::new(),
            sender_name: "Zerg".to_string(),
            sender_email: "no-reply@zerg.dev".to_string(),
            message_id: None,
            external_id: None,
            provider: None,
            retry_count,
            max_retries: DEFAULT_MAX_RETRIES,
            next_retry_at,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            failed_at: Some(now),
            error_message: Some("boom".to_string()),
            error_code: None,
            is_transactional: true,
            is_marketing: false,
            campaign: None,
            segment: None,
            tags: vec![],
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(EventKind::InventoryLow.to_string(), "inventory.low");
        assert_eq!(EventKind::from_str("inventory.low").unwrap(), EventKind::InventoryLow);
        assert_eq!(EventKind::from_str("inventory-low").unwrap(), EventKind::InventoryLow);
        assert_eq!(
            EventKind::from_str("password-reset-request").unwrap(),
            EventKind::PasswordResetRequest
        );
        assert!(EventKind::from_str("no.such.event").is_err());

        let json = serde_json::to_string(&EventKind::ActivationLink).unwrap();
        assert_eq!(json, "\"user.verify\"");
        let parsed: EventKind = serde_json::from_str("\"activation-link\"").unwrap();
        assert_eq!(parsed, EventKind::ActivationLink);
    }

    #[test]
    fn test_every_event_round_trips_through_display() {
        for kind in EventKind::iter() {
            assert_eq!(EventKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_transactional_classification() {
        assert!(EventKind::UserRegistered.is_transactional());
        assert!(EventKind::InventoryOut.is_transactional());
        assert!(!EventKind::ReportDailySummary.is_transactional());
        assert!(!EventKind::ReportCustomGenerated.is_transactional());
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        assert_eq!(retry_backoff(1), Duration::milliseconds(2_000));
        assert_eq!(retry_backoff(2), Duration::milliseconds(4_000));
        assert_eq!(retry_backoff(8), Duration::milliseconds(256_000));
        assert_eq!(retry_backoff(9), Duration::milliseconds(300_000));
        assert_eq!(retry_backoff(200), Duration::milliseconds(300_000));

        let mut previous = Duration::zero();
        for n in 0..9 {
            let delay = retry_backoff(n);
            assert!(delay > previous, "backoff must grow until the cap");
            previous = delay;
        }
    }

    #[test]
    fn test_apply_failed_schedules_retry_until_exhausted() {
        let mut record = failed_record(0, None);
        record.status = DeliveryStatus::Pending;
        let now = Utc::now();

        record.apply_failed(now, "timeout".into(), None);
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.next_retry_at, Some(now + Duration::milliseconds(2_000)));

        record.apply_failed(now, "timeout".into(), None);
        assert_eq!(record.retry_count, 2);
        assert_eq!(record.next_retry_at, Some(now + Duration::milliseconds(4_000)));

        record.apply_failed(now, "timeout".into(), Some("ETIMEDOUT".into()));
        assert_eq!(record.retry_count, 3);
        assert_eq!(record.next_retry_at, None);
        assert!(record.is_permanently_failed());
        assert!(!record.can_retry(now + Duration::days(1)));
    }

    #[test]
    fn test_can_retry_respects_backoff_window() {
        let now = Utc::now();
        let record = failed_record(1, Some(now + Duration::seconds(2)));
        assert!(record.is_retryable());
        assert!(!record.can_retry(now));
        assert!(record.can_retry(now + Duration::seconds(2)));

        let unscheduled = failed_record(1, None);
        assert!(unscheduled.can_retry(now));
    }

    #[test]
    fn test_apply_sent_clears_failure_state() {
        let mut record = failed_record(2, Some(Utc::now()));
        record.status = DeliveryStatus::Pending;
        let version = record.version;

        record.apply_sent(Utc::now(), Some("msg-1".into()), Some("smtp".into()));
        assert_eq!(record.status, DeliveryStatus::Sent);
        assert_eq!(record.retry_count, 0);
        assert!(record.error_message.is_none());
        assert!(record.error_code.is_none());
        assert_eq!(record.message_id.as_deref(), Some("msg-1"));
        assert_eq!(record.version, version + 1);
    }

    #[test]
    fn test_filter_excludes_soft_deleted() {
        let mut record = failed_record(0, None);
        let filter = DeliveryFilter::default();
        assert!(filter.matches(&record));

        record.deleted_at = Some(Utc::now());
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_filter_tags_require_all() {
        let mut record = failed_record(0, None);
        record.tags = vec!["ops".into(), "stock".into()];

        let filter = DeliveryFilter {
            tags: Some("ops, stock".into()),
            ..Default::default()
        };
        assert!(filter.matches(&record));

        let filter = DeliveryFilter {
            tags: Some("ops,billing".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_stats_delivery_rate() {
        let mut stats = DeliveryStats::default();
        assert_eq!(stats.delivery_rate(), 0.0);
        stats.add(DeliveryStatus::Delivered, 2);
        stats.add(DeliveryStatus::Read, 1);
        stats.add(DeliveryStatus::Failed, 1);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.delivery_rate(), 0.75);
    }
}
