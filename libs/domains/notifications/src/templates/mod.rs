//! Email template rendering engine.
//!
//! Every template id from the catalog is registered twice, once as HTML and
//! once as plain text (`<id>_html`, `<id>_text`). Contexts are the event
//! payloads, so placeholders use the upstream camelCase field names.

use crate::error::{NotificationError, NotificationResult};
use crate::models::Payload;
use handlebars::Handlebars;
use std::sync::Arc;
use tracing::debug;

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
    /// Email subject line.
    pub subject: String,
}

/// Template engine for rendering email templates.
#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();

        for (id, body_html, body_text) in TEMPLATES {
            let html = format!("{}{}{}", HTML_HEAD, body_html, HTML_FOOT);
            handlebars
                .register_template_string(&format!("{}_html", id), html)
                .map_err(|e| {
                    NotificationError::Template(format!("Failed to register {}_html: {}", id, e))
                })?;
            handlebars
                .register_template_string(&format!("{}_text", id), *body_text)
                .map_err(|e| {
                    NotificationError::Template(format!("Failed to register {}_text: {}", id, e))
                })?;
        }

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    /// Whether both variants of a template id are registered.
    pub fn has_template(&self, template_id: &str) -> bool {
        self.handlebars.has_template(&format!("{}_html", template_id))
            && self.handlebars.has_template(&format!("{}_text", template_id))
    }

    /// Render a template id with the given context.
    pub fn render(
        &self,
        template_id: &str,
        subject: &str,
        context: &Payload,
    ) -> NotificationResult<RenderedEmail> {
        if !self.has_template(template_id) {
            return Err(NotificationError::Template(format!(
                "Unknown template: {}",
                template_id
            )));
        }
        debug!(template = %template_id, "Rendering email");

        let mut data = context.clone();
        data.entry("subject")
            .or_insert_with(|| serde_json::Value::String(subject.to_string()));

        let html = self
            .handlebars
            .render(&format!("{}_html", template_id), &data)?;
        let text = self
            .handlebars
            .render(&format!("{}_text", template_id), &data)?;

        Ok(RenderedEmail {
            html,
            text,
            subject: subject.to_string(),
        })
    }
}

// ============================================================================
// Email Templates
// ============================================================================

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{subject}}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px;">
"#;

const HTML_FOOT: &str = r#"
      </td>
    </tr>
  </table>
</body>
</html>"#;

/// `(template id, html body, text body)`.
const TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "auth/register-success",
        r#"<h1 style="color: #18181b; font-size: 24px;">Welcome{{#if name}}, {{name}}{{/if}}!</h1>
<p style="color: #52525b; font-size: 16px;">Your account has been created successfully.</p>"#,
        r#"Welcome{{#if name}}, {{name}}{{/if}}!

Your account has been created successfully."#,
    ),
    (
        "auth/activation-account",
        r#"<h1 style="color: #18181b; font-size: 24px;">Hi {{name}},</h1>
<p style="color: #52525b; font-size: 16px;">Confirm your email address to activate your account.</p>
<p><a href="{{activationLink}}" style="background-color: #2563eb; color: #ffffff; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Activate account</a></p>"#,
        r#"Hi {{name}},

Confirm your email address to activate your account:
{{activationLink}}"#,
    ),
    (
        "auth/req-reset-password",
        r#"<h1 style="color: #18181b; font-size: 24px;">Hi {{name}},</h1>
<p style="color: #52525b; font-size: 16px;">We received a request to reset your password.</p>
<p><a href="{{resetLink}}" style="background-color: #2563eb; color: #ffffff; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Reset password</a></p>
<p style="color: #71717a; font-size: 12px;">If you did not ask for this, you can ignore this email.</p>"#,
        r#"Hi {{name}},

We received a request to reset your password:
{{resetLink}}

If you did not ask for this, you can ignore this email."#,
    ),
    (
        "auth/password-reset-success",
        r#"<h1 style="color: #18181b; font-size: 24px;">Hi {{name}},</h1>
<p style="color: #52525b; font-size: 16px;">Your password has been changed. If this wasn't you, contact support right away.</p>"#,
        r#"Hi {{name}},

Your password has been changed. If this wasn't you, contact support right away."#,
    ),
    (
        "auth/account-deactivated",
        r#"<h1 style="color: #18181b; font-size: 24px;">Hi {{name}},</h1>
<p style="color: #52525b; font-size: 16px;">Your account has been deactivated.</p>"#,
        r#"Hi {{name}},

Your account has been deactivated."#,
    ),
    (
        "inventory/stock-low",
        r#"<h1 style="color: #b45309; font-size: 24px;">Low stock: {{product}}</h1>
<p style="color: #52525b; font-size: 16px;">Only <strong>{{quantity}}</strong> units left at {{location}}.</p>"#,
        r#"Low stock: {{product}}

Only {{quantity}} units left at {{location}}."#,
    ),
    (
        "inventory/stock-out",
        r#"<h1 style="color: #b91c1c; font-size: 24px;">Out of stock: {{product}}</h1>
<p style="color: #52525b; font-size: 16px;">{{product}} is out of stock at {{location}}.</p>
<p style="color: #71717a; font-size: 12px;">Last update: {{lastUpdate}}</p>"#,
        r#"Out of stock: {{product}}

{{product}} is out of stock at {{location}}.
Last update: {{lastUpdate}}"#,
    ),
    (
        "inventory/transfer-completed",
        r#"<h1 style="color: #15803d; font-size: 24px;">Transfer completed</h1>
<p style="color: #52525b; font-size: 16px;">{{quantity}} x {{product}} moved from {{fromLocation}} to {{toLocation}} on {{date}}.</p>"#,
        r#"Transfer completed

{{quantity}} x {{product}} moved from {{fromLocation}} to {{toLocation}} on {{date}}."#,
    ),
    (
        "reports/daily-summary",
        r#"<h1 style="color: #18181b; font-size: 24px;">Daily summary for {{date}}</h1>
<p style="color: #52525b; font-size: 16px;">Hi {{name}}, {{summary}}</p>
<table width="100%" cellspacing="0" cellpadding="4" style="color: #52525b; font-size: 14px;">
  <tr><td>Sales</td><td>{{sales}}</td></tr>
  <tr><td>Purchases</td><td>{{purchases}}</td></tr>
  <tr><td>New products</td><td>{{newProducts}}</td></tr>
  <tr><td>Stock movements</td><td>{{stockMovements}}</td></tr>
  <tr><td>Transfers</td><td>{{transfers}}</td></tr>
</table>
{{#if lowStockCount}}<h2 style="font-size: 16px;">Low stock</h2><ul>{{#each lowStockCount}}<li>{{this}}</li>{{/each}}</ul>{{/if}}
{{#if outOfStockCount}}<h2 style="font-size: 16px;">Out of stock</h2><ul>{{#each outOfStockCount}}<li>{{this}}</li>{{/each}}</ul>{{/if}}"#,
        r#"Daily summary for {{date}}

Hi {{name}}, {{summary}}

Sales: {{sales}}
Purchases: {{purchases}}
New products: {{newProducts}}
Stock movements: {{stockMovements}}
Transfers: {{transfers}}
{{#if lowStockCount}}
Low stock:
{{#each lowStockCount}}- {{this}}
{{/each}}{{/if}}{{#if outOfStockCount}}
Out of stock:
{{#each outOfStockCount}}- {{this}}
{{/each}}{{/if}}"#,
    ),
    (
        "reports/monthly-performance",
        r#"<h1 style="color: #18181b; font-size: 24px;">Monthly summary: {{month}} {{year}}</h1>
<p style="color: #52525b; font-size: 16px;">Hi {{name}}, here is how the month went.</p>
<table width="100%" cellspacing="0" cellpadding="4" style="color: #52525b; font-size: 14px;">
  <tr><td>Total sales</td><td>{{totalSales}}</td></tr>
  <tr><td>Total purchases</td><td>{{totalPurchases}}</td></tr>
  <tr><td>New customers</td><td>{{newCustomers}}</td></tr>
  <tr><td>Average inventory</td><td>{{avgInventory}}</td></tr>
  <tr><td>Profitability</td><td>{{profitability}}</td></tr>
</table>
{{#if topProducts}}<h2 style="font-size: 16px;">Top products</h2><ol>{{#each topProducts}}<li>{{#if this.name}}{{this.name}}{{else}}{{this}}{{/if}}</li>{{/each}}</ol>{{/if}}
{{#if reportLink}}<p><a href="{{reportLink}}">Open the full report</a></p>{{/if}}"#,
        r#"Monthly summary: {{month}} {{year}}

Hi {{name}}, here is how the month went.

Total sales: {{totalSales}}
Total purchases: {{totalPurchases}}
New customers: {{newCustomers}}
Average inventory: {{avgInventory}}
Profitability: {{profitability}}
{{#if reportLink}}
Full report: {{reportLink}}{{/if}}"#,
    ),
    (
        "reports/custom-generated",
        r#"<h1 style="color: #18181b; font-size: 24px;">{{reportName}} is ready</h1>
<p style="color: #52525b; font-size: 16px;">Hi {{name}}, your custom report has been generated.</p>
<p><a href="{{reportLink}}" style="background-color: #2563eb; color: #ffffff; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Download report</a></p>"#,
        r#"{{reportName}} is ready

Hi {{name}}, your custom report has been generated:
{{reportLink}}"#,
    ),
];
