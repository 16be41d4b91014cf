//! Static event → template/subject table.
//!
//! Built once at startup and shared read-only behind an `Arc`.

use std::collections::HashMap;

use sea_orm::Iterable;

use crate::models::EventKind;

/// Template metadata for one event kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    pub key: &'static str,
    pub subject: &'static str,
    pub template: &'static str,
    pub description: &'static str,
}

/// Default sender identity stamped on every delivery record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub name: String,
    pub email: String,
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self {
            name: "Zerg Notifications".to_string(),
            email: "no-reply@zerg.dev".to_string(),
        }
    }
}

/// Read-only lookup from event kind to template and subject.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    entries: HashMap<EventKind, TemplateSpec>,
    sender: SenderIdentity,
}

fn spec_for(kind: EventKind) -> TemplateSpec {
    let (key, subject, template, description) = match kind {
        EventKind::UserRegistered => (
            "auth.register.success",
            "Welcome aboard!",
            "auth/register-success",
            "Sent after a user registers successfully.",
        ),
        EventKind::ActivationLink => (
            "auth.activation.link",
            "Activate your account",
            "auth/activation-account",
            "Sent so the user can verify their account.",
        ),
        EventKind::PasswordResetRequest => (
            "auth.req.reset.password",
            "Reset your password",
            "auth/req-reset-password",
            "Sent when the user asks to reset their password.",
        ),
        EventKind::PasswordResetSuccess => (
            "auth.password.reset.success",
            "Your password has been changed",
            "auth/password-reset-success",
            "Sent after the password was changed.",
        ),
        EventKind::AccountDeactivated => (
            "auth.account.deactivated",
            "Your account has been deactivated",
            "auth/account-deactivated",
            "Sent after the account was deactivated.",
        ),
        EventKind::InventoryLow => (
            "inventory.low",
            "Low stock alert",
            "inventory/stock-low",
            "Sent to operators when a product runs low.",
        ),
        EventKind::InventoryOut => (
            "inventory.out",
            "Product out of stock",
            "inventory/stock-out",
            "Sent to operators when a product is out of stock.",
        ),
        EventKind::InventoryTransferComplete => (
            "inventory.transfer.complete",
            "Inventory transfer completed",
            "inventory/transfer-completed",
            "Sent to operators when a stock transfer completes.",
        ),
        EventKind::ReportDailySummary => (
            "report.daily.summary",
            "Daily sales summary",
            "reports/daily-summary",
            "Daily sales summary for administrators.",
        ),
        EventKind::ReportMonthlySummary => (
            "report.monthly.summary",
            "Monthly sales summary",
            "reports/monthly-performance",
            "Monthly sales summary for administrators.",
        ),
        EventKind::ReportCustomGenerated => (
            "report.custom.generated",
            "Your custom report is ready",
            "reports/custom-generated",
            "Sent when a custom report has been generated.",
        ),
    };
    TemplateSpec {
        key,
        subject,
        template,
        description,
    }
}

impl TemplateCatalog {
    /// Catalog with every event kind and the given sender identity.
    pub fn new(sender: SenderIdentity) -> Self {
        let entries = EventKind::iter().map(|k| (k, spec_for(k))).collect();
        Self { entries, sender }
    }

    pub fn get(&self, kind: EventKind) -> &TemplateSpec {
        // Built from EventKind::iter(), so every kind is present.
        &self.entries[&kind]
    }

    pub fn subject(&self, kind: EventKind) -> &'static str {
        self.get(kind).subject
    }

    pub fn template(&self, kind: EventKind) -> &'static str {
        self.get(kind).template
    }

    pub fn sender(&self) -> &SenderIdentity {
        &self.sender
    }

    /// Every template id in the catalog.
    pub fn template_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.values().map(|spec| spec.template)
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::new(SenderIdentity::default())
    }
}
