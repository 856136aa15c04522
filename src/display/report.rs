//! Service report display
//!
//! Plain-text summaries for sync, diff, copy and orphan results.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::services::{CopyReport, Orphan, ParameterDiff, SyncReport, SyncStatus};

#[derive(Tabled)]
struct SyncRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Tabled)]
struct OrphanRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Problem")]
    kind: String,
    #[tabled(rename = "Recorded (UTC)")]
    recorded_at: String,
    #[tabled(rename = "Op")]
    origin: String,
}

/// Per-item sync results followed by totals
pub fn format_sync_report(report: &SyncReport) -> String {
    let rows = report.results.iter().map(|(key, status)| SyncRow {
        key: key.to_string(),
        result: match status {
            SyncStatus::Success => "ok".to_string(),
            SyncStatus::Failure(reason) => format!("FAILED: {}", reason),
        },
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push_str(&format!(
        "\nSynced '{}': {} succeeded, {} failed",
        report.prefix,
        report.succeeded(),
        report.failed()
    ));
    output
}

/// `+`/`-`/`~` lines per name, like a unified diff header
pub fn format_diff(prefix_a: &str, prefix_b: &str, diff: &ParameterDiff) -> String {
    if diff.is_empty() {
        return format!("No differences between '{}' and '{}'.", prefix_a, prefix_b);
    }

    let mut output = format!("--- {}\n+++ {}\n", prefix_a, prefix_b);
    for name in &diff.added {
        output.push_str(&format!("+ {}\n", name));
    }
    for name in &diff.removed {
        output.push_str(&format!("- {}\n", name));
    }
    for name in &diff.changed {
        output.push_str(&format!("~ {}\n", name));
    }
    output.push_str(&format!(
        "{} added, {} removed, {} changed",
        diff.added.len(),
        diff.removed.len(),
        diff.changed.len()
    ));
    output
}

pub fn format_copy_report(source: &str, target: &str, report: &CopyReport) -> String {
    let mut output = String::new();
    for name in &report.copied {
        output.push_str(&format!("copied  {}\n", name));
    }
    for name in &report.skipped {
        output.push_str(&format!("skipped {} (exists in '{}')\n", name, target));
    }
    output.push_str(&format!(
        "Copied {} parameter(s) from '{}' to '{}', skipped {}",
        report.copied.len(),
        source,
        target,
        report.skipped.len()
    ));
    output
}

pub fn format_orphans(orphans: &[Orphan]) -> String {
    if orphans.is_empty() {
        return "No orphaned audit records.".to_string();
    }

    let rows = orphans.iter().map(|o| OrphanRow {
        key: o.key.to_string(),
        kind: o.kind.to_string(),
        recorded_at: o.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        origin: o.origin.to_string(),
    });

    Table::new(rows).with(Style::psql()).to_string()
}
