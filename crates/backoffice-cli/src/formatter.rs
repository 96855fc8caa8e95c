//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use serde_json::json;

use backoffice_client::{ClientEvent, NoticeLevel};
use backoffice_core::{EffectivePermissions, GuardDecision, RequiredPermission};
use backoffice_proto::Principal;

use crate::routes::RouteEntry;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a principal with its effective action keys.
    fn format_principal(&self, principal: &Principal, permissions: &EffectivePermissions) -> String;

    /// Format the result of a permission check.
    fn format_check(&self, required: &RequiredPermission, allowed: bool) -> String;

    /// Format the guard decision for one route.
    fn format_decision(&self, route: &str, decision: &GuardDecision) -> String;

    /// Format the route table with a decision per route.
    fn format_routes(&self, routes: &[(RouteEntry, GuardDecision)]) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_principal(&self, principal: &Principal, permissions: &EffectivePermissions) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Value"]);
        table.add_row(vec![Cell::new("id"), Cell::new(principal.id.as_str())]);
        table.add_row(vec![Cell::new("name"), Cell::new(principal.display_name())]);
        table.add_row(vec![
            Cell::new("email"),
            Cell::new(principal.email.as_deref().unwrap_or("-")),
        ]);
        table.add_row(vec![Cell::new("kind"), Cell::new(principal.kind)]);
        table.add_row(vec![
            Cell::new("role"),
            Cell::new(format!("{} ({})", principal.role.name, principal.role.value)),
        ]);

        let keys = permissions.sorted();
        let keys = if keys.is_empty() {
            "-".to_string()
        } else {
            keys.join("\n")
        };
        table.add_row(vec![Cell::new("permissions"), Cell::new(keys)]);

        table.to_string()
    }

    fn format_check(&self, required: &RequiredPermission, allowed: bool) -> String {
        let verdict = if allowed { "allowed" } else { "denied" };
        format!("{}: {}", required, verdict)
    }

    fn format_decision(&self, route: &str, decision: &GuardDecision) -> String {
        format!("{}: {}", route, decision_label(decision))
    }

    fn format_routes(&self, routes: &[(RouteEntry, GuardDecision)]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Route", "Requires", "Decision"]);

        for (entry, decision) in routes {
            table.add_row(vec![
                Cell::new(entry.path),
                Cell::new(entry.access),
                Cell::new(decision_label(decision)),
            ]);
        }

        format!("{}\n{} route(s)", table, routes.len())
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_principal(&self, principal: &Principal, permissions: &EffectivePermissions) -> String {
        pretty(json!({
            "principal": principal,
            "permissions": permissions.sorted(),
        }))
    }

    fn format_check(&self, required: &RequiredPermission, allowed: bool) -> String {
        json!({
            "required": required.to_string(),
            "allowed": allowed,
        })
        .to_string()
    }

    fn format_decision(&self, route: &str, decision: &GuardDecision) -> String {
        let mut value = decision_json(decision);
        value["route"] = json!(route);
        value.to_string()
    }

    fn format_routes(&self, routes: &[(RouteEntry, GuardDecision)]) -> String {
        let rows: Vec<serde_json::Value> = routes
            .iter()
            .map(|(entry, decision)| {
                let mut value = decision_json(decision);
                value["route"] = json!(entry.path);
                value["access"] = json!(entry.access);
                value
            })
            .collect();
        pretty(serde_json::Value::Array(rows))
    }

    fn format_message(&self, message: &str) -> String {
        json!({
            "message": message
        })
        .to_string()
    }
}

/// Human-readable decision.
fn decision_label(decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Pending => "pending".to_string(),
        GuardDecision::Render => "render".to_string(),
        GuardDecision::Redirect(to) => format!("redirect to {}", to),
    }
}

fn decision_json(decision: &GuardDecision) -> serde_json::Value {
    match decision {
        GuardDecision::Pending => json!({ "decision": "pending" }),
        GuardDecision::Render => json!({ "decision": "render" }),
        GuardDecision::Redirect(to) => json!({ "decision": "redirect", "to": to }),
    }
}

fn pretty(value: serde_json::Value) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// One line for stderr describing a client event.
pub fn format_event(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Notice(notice) => {
            let label = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Error => "error",
                NoticeLevel::SessionExpired => "session expired",
            };
            format!("[{}] {}", label, notice.message)
        }
        ClientEvent::Redirect { to } => format!("[redirect] {}", to),
    }
}
