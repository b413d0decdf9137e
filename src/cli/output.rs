//! Output formatting for CLI

use crate::RunSummary;
use crate::services::format::format_elapsed;
use std::time::Duration;

/// Format a run summary as human-readable lines
#[must_use]
pub fn format_text(summary: &RunSummary) -> String {
    let mut lines = vec![format!(
        "{} unique file(s) decompiled into {}",
        summary.decompiled, summary.output
    )];

    if summary.duplicates > 0 {
        lines.push(format!("{} duplicate(s) skipped", summary.duplicates));
    }
    if summary.failed > 0 {
        lines.push(format!(
            "{} file(s) failed to decompile, see decompile-failure.log in their output directories",
            summary.failed
        ));
    }

    lines.push(format!(
        "finished after {}",
        format_elapsed(Duration::from_millis(summary.elapsed_ms))
    ));
    lines.join("\n")
}

/// Format a run summary as JSON
#[must_use]
pub fn format_json(summary: &RunSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}
