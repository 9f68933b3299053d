//! User interface functions for the CLI.
//! Header, color detection and the closing verdict line, all on stderr so
//! stdout carries only the report.

use colored::Colorize;
use engine::ScanReport;
use loader::Severity;
use std::env;
use std::io::{self, IsTerminal};

pub fn print_header() {
    let version = env!("CARGO_PKG_VERSION");
    let spaces = " ".repeat(24usize.saturating_sub(version.len()));
    eprintln!(
        r#"
    ╭──────────────────────────────────────╮
    │                                      │
    │            W E B G U A R D           │
    │                                      │
    │     Laravel security scanner         │
    │     Version: {version}{spaces}│
    │                                      │
    ╰──────────────────────────────────────╯
"#
    );
}

/// Whether text output may carry ANSI colors.
pub fn use_colored_output(disabled: bool) -> bool {
    if disabled || env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" || term == "unknown" {
            return false;
        }
    }
    if env::var_os("CI").is_some() || env::var_os("CONTINUOUS_INTEGRATION").is_some() {
        return false;
    }
    io::stdout().is_terminal()
}

/// Plain text of the verdict printed after a scan.
pub fn verdict(report: &ScanReport, fail_on: Option<Severity>) -> String {
    let findings = report.findings().len();
    let errored = report.status_counts().errored;
    let mut line = match (findings, report.max_severity()) {
        (0, _) | (_, None) => "No issues found".to_string(),
        (n, Some(max)) => format!("{n} issue(s) found, highest severity {max}"),
    };
    if errored > 0 {
        line.push_str(&format!("; {errored} rule(s) errored"));
    }
    if let Some(threshold) = fail_on {
        if report.has_findings_at_or_above(threshold) {
            line.push_str(&format!("; failing at or above {threshold}"));
        }
    }
    line
}

pub fn print_verdict(report: &ScanReport, fail_on: Option<Severity>, color: bool) {
    let text = verdict(report, fail_on);
    if !color {
        eprintln!("{text}");
        return;
    }
    let failing = fail_on.is_some_and(|t| report.has_findings_at_or_above(t));
    let styled = if failing {
        text.bright_red().bold()
    } else if report.findings().is_empty() {
        text.bright_green().bold()
    } else {
        text.bright_yellow()
    };
    eprintln!("{styled}");
}
