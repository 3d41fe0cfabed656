//! Output formatting utilities for the CLI
//!
//! Colored status lines for run progress, and the per-tunnel outcome table
//! printed after the join barrier completes.

use tabled::{settings::Style, Table, Tabled};

use dp_proxy::tunnel::{TunnelOutcome, TunnelReport};

/// Format the per-tunnel outcome summary as an ASCII table
///
/// One row per started tunnel, in start order. Failed tunnels carry the
/// child process diagnostics; canceled tunnels are reported as canceled,
/// never as failures.
pub fn format_reports(reports: &[TunnelReport]) -> String {
    if reports.is_empty() {
        return "No tunnels configured".to_string();
    }

    #[derive(Tabled)]
    struct ReportRow {
        #[tabled(rename = "TUNNEL")]
        label: String,
        #[tabled(rename = "LOCAL PORT")]
        local_port: u16,
        #[tabled(rename = "OUTCOME")]
        outcome: String,
    }

    let rows: Vec<ReportRow> = reports
        .iter()
        .map(|r| ReportRow {
            label: r.label.clone(),
            local_port: r.local_port,
            outcome: r.outcome.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// One-line run summary: how many tunnels succeeded, failed, were canceled
pub fn summarize_outcomes(reports: &[TunnelReport]) -> String {
    let mut succeeded = 0;
    let mut failed = 0;
    let mut canceled = 0;

    for report in reports {
        match report.outcome {
            TunnelOutcome::Succeeded => succeeded += 1,
            TunnelOutcome::Failed(_) => failed += 1,
            TunnelOutcome::Canceled => canceled += 1,
        }
    }

    format!(
        "{} succeeded, {} failed, {} canceled",
        succeeded, failed, canceled
    )
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
