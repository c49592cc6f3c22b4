//! Output helpers shared by the subcommands.

use listharvest_core::PersistSummary;
use serde::Serialize;

use crate::session::SessionReport;

/// Global output flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// Whether human-oriented status lines should be printed.
    pub fn chatty(&self) -> bool {
        !self.json && !self.quiet
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}

/// Render one session report for a terminal.
pub fn render_report(report: &SessionReport, stored: Option<&PersistSummary>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({} / {})\n",
        report.username, report.site, report.status
    ));
    out.push_str(&format!(
        "  acquisition: {} after {} step(s), {} item(s)\n",
        report.outcome.reason, report.outcome.steps, report.outcome.final_count
    ));
    out.push_str(&format!(
        "  records:     {} kept, {} dropped\n",
        report.result.count, report.result.dropped
    ));
    for record in &report.result.records {
        let mut line = format!("    {}", record.title);
        if record.has_alt_title() {
            line.push_str(&format!(" ({})", record.alt_title));
        }
        if !record.tags.is_empty() {
            line.push_str(&format!(" [{}]", record.tags.join(", ")));
        }
        out.push_str(&line);
        out.push('\n');
    }
    if let Some(summary) = stored {
        match &summary.oldest {
            Some(marker) if summary.oldest_updated => {
                out.push_str(&format!("  oldest:      {marker} (new)\n"))
            }
            Some(marker) => out.push_str(&format!("  oldest:      {marker}\n")),
            None => {}
        }
    }
    out
}
