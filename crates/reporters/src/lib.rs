//! Formatters for scan reports in text, JSON and SARIF.
//! Provide human and tool-friendly output.

use engine::{RuleReport, ScanReport, StatusCounts};
use loader::Severity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

mod sarif;

pub use sarif::to_sarif;

/// Name of the tool as it appears in reports.
pub const TOOL_NAME: &str = "webguard";

/// Returns the severity colored with simple ANSI codes.
fn color_severity(sev: Severity) -> String {
    let code = match sev {
        Severity::Info => "\x1b[36m",
        Severity::Low => "\x1b[32m",
        Severity::Medium => "\x1b[33m",
        Severity::High => "\x1b[31m",
        Severity::Critical => "\x1b[1;31m",
    };
    format!("{code}{sev}\x1b[0m")
}

fn severity_label(sev: Severity, color: bool) -> String {
    if color {
        color_severity(sev)
    } else {
        sev.to_string()
    }
}

fn simple_box(title: &str) -> String {
    let width = title.chars().count() + 2;
    format!(
        "╭{}╮\n│ {} │\n╰{}╯\n",
        "─".repeat(width),
        title,
        "─".repeat(width)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Supported formats for printing a scan report.
pub enum Format {
    /// Human-readable output in plain text.
    Text,
    /// JSON structure for integrations.
    Json,
    /// Report conforming to the SARIF 2.1.0 specification.
    Sarif,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "sarif" => Ok(Format::Sarif),
            other => Err(format!("invalid format '{other}'")),
        }
    }
}

#[derive(Serialize)]
struct Summary {
    rules: usize,
    #[serde(flatten)]
    status: StatusCounts,
    findings: usize,
    by_severity: BTreeMap<Severity, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_severity: Option<Severity>,
}

#[derive(Serialize)]
/// Wrapper used when serialising to JSON.
struct ReportOut<'a> {
    tool: &'static str,
    version: &'static str,
    root: &'a Path,
    duration_ms: u64,
    summary: Summary,
    results: &'a [RuleReport],
}

impl<'a> ReportOut<'a> {
    fn new(report: &'a ScanReport) -> Self {
        ReportOut {
            tool: TOOL_NAME,
            version: env!("CARGO_PKG_VERSION"),
            root: &report.root,
            duration_ms: report.duration_ms,
            summary: Summary {
                rules: report.results.len(),
                status: report.status_counts(),
                findings: report.findings().len(),
                by_severity: report.counts(),
                max_severity: report.max_severity(),
            },
            results: &report.results,
        }
    }
}

fn write_status<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    let counts = report.status_counts();
    writeln!(out, "{}", simple_box("Analysis Status"))?;
    writeln!(
        out,
        "    Ran {} rules on {} in {}ms\n",
        report.results.len(),
        report.root.display(),
        report.duration_ms
    )?;
    writeln!(out, "    Rule                     Status    Time   Details")?;
    writeln!(out, "    {}", "─".repeat(74))?;
    for r in &report.results {
        writeln!(
            out,
            "    {:<24} {:<9} {:>4}ms  {}",
            r.metadata.id,
            r.outcome.label(),
            r.duration_ms,
            r.outcome.message()
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "    passed {}  failed {}  warning {}  skipped {}  errored {}",
        counts.passed, counts.failed, counts.warning, counts.skipped, counts.errored
    )?;
    Ok(())
}

fn write_text<W: Write>(out: &mut W, report: &ScanReport, color: bool) -> io::Result<()> {
    write_status(out, report)?;
    writeln!(out)?;
    writeln!(out, "{}", simple_box("Results"))?;
    let findings = report.findings();
    if findings.is_empty() {
        writeln!(out, "✔ No issues found.")?;
        return Ok(());
    }
    writeln!(out, "⚠ Found {} issue(s):\n", findings.len())?;
    for f in &findings {
        writeln!(
            out,
            "{} {}:{} {}",
            severity_label(f.severity, color),
            f.file().display(),
            f.line(),
            f.rule_id
        )?;
        writeln!(out, "    {}", f.message)?;
        if let Some(snippet) = &f.code_snippet {
            writeln!(out, "    ↳  {}", snippet.trim())?;
        }
        if !f.recommendation.is_empty() {
            writeln!(out, "    • Remediation: {}", f.recommendation)?;
        }
        writeln!(out)?;
    }
    let by_severity: Vec<String> = report
        .counts()
        .iter()
        .rev()
        .map(|(sev, n)| format!("{n} {}", sev.to_string().to_lowercase()))
        .collect();
    writeln!(out, "Total: {} ({})", findings.len(), by_severity.join(", "))?;
    Ok(())
}

/// Writes `report` to `out` in the selected format. Text output carries no
/// ANSI colors; see [`write_report_colored`].
///
/// # Example
/// ```
/// use engine::ScanReport;
/// use reporters::{write_report, Format};
///
/// let mut buf = Vec::new();
/// write_report(&mut buf, &ScanReport::default(), Format::Text).unwrap();
/// assert!(String::from_utf8(buf).unwrap().contains("No issues found"));
/// ```
pub fn write_report<W: Write>(out: &mut W, report: &ScanReport, fmt: Format) -> io::Result<()> {
    render(out, report, fmt, false)
}

/// Like [`write_report`], with colored severities in text output.
pub fn write_report_colored<W: Write>(
    out: &mut W,
    report: &ScanReport,
    fmt: Format,
) -> io::Result<()> {
    render(out, report, fmt, true)
}

fn render<W: Write>(out: &mut W, report: &ScanReport, fmt: Format, color: bool) -> io::Result<()> {
    match fmt {
        Format::Text => write_text(out, report, color)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, &ReportOut::new(report))?;
            writeln!(out)?;
        }
        Format::Sarif => {
            let sarif = sarif::to_sarif(report);
            serde_json::to_writer_pretty(&mut *out, &sarif)?;
            writeln!(out)?;
        }
    }
    tracing::debug!(format = ?fmt, findings = report.findings().len(), "Report written");
    Ok(())
}
