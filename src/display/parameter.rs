//! Parameter and audit history display
//!
//! Formats redacted parameters and audit records as tables.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::audit::AuditRecord;
use crate::models::Parameter;

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Secret")]
    secret: &'static str,
    #[tabled(rename = "Comment")]
    comment: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "When (UTC)")]
    when: String,
    #[tabled(rename = "Op")]
    origin: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "By")]
    actor: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        ""
    }
}

/// Format a list of parameters as a table
pub fn format_parameter_list(parameters: &[Parameter]) -> String {
    if parameters.is_empty() {
        return "No parameters found.".to_string();
    }

    let rows = parameters.iter().map(|p| ParameterRow {
        prefix: p.prefix.clone(),
        name: p.name.clone(),
        value: p.value.clone(),
        secret: yes_no(p.secret),
        comment: p.comment.clone(),
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push_str(&format!("\n{} parameter(s)", parameters.len()));
    output
}

/// Format audit records, oldest first
pub fn format_history(records: &[AuditRecord]) -> String {
    if records.is_empty() {
        return "No audit records found.".to_string();
    }

    let rows = records.iter().map(|r| HistoryRow {
        when: r.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        origin: r.origin.to_string(),
        key: r.key().to_string(),
        value: r.value.clone(),
        actor: format!("{} <{}>", r.username, r.useremail),
        comment: r.comment.clone(),
    });

    Table::new(rows).with(Style::psql()).to_string()
}
