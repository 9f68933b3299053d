use anyhow::{Context, Result};
use clap::ValueEnum;
use engine::ScanReport;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Supported output formats for scan results.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Sarif,
}

impl From<Format> for reporters::Format {
    fn from(fmt: Format) -> Self {
        match fmt {
            Format::Text => reporters::Format::Text,
            Format::Json => reporters::Format::Json,
            Format::Sarif => reporters::Format::Sarif,
        }
    }
}

/// Writes the report to `dest`, or stdout when `None`. Colors apply only
/// to text written to stdout.
pub fn emit(report: &ScanReport, fmt: Format, dest: Option<&Path>, color: bool) -> Result<()> {
    match dest {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            reporters::write_report(&mut out, report, fmt.into())?;
            out.flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if color {
                reporters::write_report_colored(&mut out, report, fmt.into())?;
            } else {
                reporters::write_report(&mut out, report, fmt.into())?;
            }
            out.flush()?;
        }
    }
    Ok(())
}
