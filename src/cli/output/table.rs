//! Table output formatting for CLI commands
//!
//! Renders run summaries, bug lists and framework listings using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;
use crate::domain::models::{BugReport, BugSeverity, PipelineResult};

/// One row of the `frameworks` listing
pub struct FrameworkRow<'a> {
    /// Framework name
    pub name: &'a str,
    /// Whether it recognised the project
    pub detected: bool,
    /// Whether `run` would use it
    pub selected: bool,
    /// Prerequisite check, with the reason on failure
    pub prerequisites: Result<(), &'a str>,
}

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    /// Formatter with colors when the terminal supports them.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Formatter with explicit color and width settings.
    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Key/value summary of a finished run
    pub fn format_summary(&self, result: &PipelineResult, tokens_used: u64) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Run").add_attribute(Attribute::Bold),
            Cell::new(result.run_id.to_string()),
        ]);

        let outcome = if result.success { "success" } else { "failed" };
        let outcome_cell = if self.use_colors {
            Cell::new(outcome).fg(if result.success { Color::Green } else { Color::Red })
        } else {
            Cell::new(outcome)
        };
        table.add_row(vec![Cell::new("Outcome"), outcome_cell]);

        let stop = result
            .stop_reason
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        table.add_row(vec![Cell::new("Stop reason"), Cell::new(stop)]);
        table.add_row(vec![Cell::new("Iterations"), Cell::new(result.iterations_run)]);
        table.add_row(vec![
            Cell::new("Tests (latest run)"),
            Cell::new(format!(
                "{} run, {} passed, {} failed, {} errors",
                result.tests_run, result.tests_passed, result.tests_failed, result.tests_errors
            )),
        ]);

        if let Some(coverage) = &result.coverage {
            table.add_row(vec![
                Cell::new("Line coverage"),
                Cell::new(format!("{:.1}%", coverage.line_coverage)),
            ]);
        }

        table.add_row(vec![Cell::new("Bugs (latest run)"), Cell::new(result.bugs_found.len())]);
        table.add_row(vec![
            Cell::new("Fixes verified / applied"),
            Cell::new(format!(
                "{} / {}",
                result.fixes_generated.len(),
                result.fixes_applied.len()
            )),
        ]);
        table.add_row(vec![Cell::new("Tokens used"), Cell::new(tokens_used)]);

        if let Some(finished) = result.finished_at {
            let elapsed = finished - result.started_at;
            table.add_row(vec![
                Cell::new("Duration"),
                Cell::new(format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)),
            ]);
        }

        table.to_string()
    }

    /// Bug reports of the latest round
    pub fn format_bugs(&self, bugs: &[BugReport]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Severity").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Location").add_attribute(Attribute::Bold),
        ]);

        for bug in bugs {
            let severity = if self.use_colors {
                Cell::new(bug.severity.to_string()).fg(severity_color(bug.severity))
            } else {
                Cell::new(bug.severity.to_string())
            };

            let location = match bug.location.line_number {
                Some(line) => format!("{}:{line}", bug.location.file_path),
                None => bug.location.file_path.clone(),
            };

            table.add_row(vec![
                severity,
                Cell::new(bug.bug_type.to_string()),
                Cell::new(truncate(&bug.title, 50)),
                Cell::new(truncate(&location, 40)),
            ]);
        }

        table.to_string()
    }

    /// Framework listing, one row per registered runner
    pub fn format_frameworks(&self, rows: &[FrameworkRow<'_>]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Framework").add_attribute(Attribute::Bold),
            Cell::new("Detected").add_attribute(Attribute::Bold),
            Cell::new("Prerequisites").add_attribute(Attribute::Bold),
        ]);

        for row in rows {
            let name = if row.selected {
                format!("{} *", row.name)
            } else {
                row.name.to_string()
            };
            let prerequisites = match row.prerequisites {
                Ok(()) => Cell::new("ok"),
                Err(reason) if self.use_colors => Cell::new(reason).fg(Color::Yellow),
                Err(reason) => Cell::new(reason),
            };

            table.add_row(vec![
                Cell::new(name),
                Cell::new(if row.detected { "yes" } else { "no" }),
                prerequisites,
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

const fn severity_color(severity: BugSeverity) -> Color {
    match severity {
        BugSeverity::Critical => Color::Red,
        BugSeverity::High => Color::DarkRed,
        BugSeverity::Medium => Color::Yellow,
        BugSeverity::Low => Color::Blue,
        BugSeverity::Info => Color::Grey,
    }
}

/// Check if the terminal supports colors
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}
