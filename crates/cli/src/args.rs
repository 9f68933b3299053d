use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::Format;
use loader::Severity;

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse()
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let v: usize = s
        .parse()
        .map_err(|e: std::num::ParseIntError| e.to_string())?;
    if v == 0 {
        Err("threads must be greater than 0".into())
    } else {
        Ok(v)
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "webguard - security scanner for Laravel applications",
    long_about = "webguard statically scans a Laravel project for security misconfigurations: \
missing authentication middleware, CSRF gaps, debug mode exposure, weak password hashing, \
SQL built from strings, mass assignment, dependency hygiene and HTTP security headers.

Examples:
  webguard scan .                        # Scan the current project
  webguard scan . --format sarif         # SARIF for code scanning uploads
  webguard scan . --fail-on high         # Exit 1 on HIGH or CRITICAL findings
  webguard rules list                    # Show the built-in rules",
    subcommand_required = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a Laravel project
    Scan(ScanArgs),
    /// Inspect the built-in rules
    #[command(subcommand, alias = "rule")]
    Rules(RulesCmd),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScanArgs {
    /// Root directory of the project
    pub path: PathBuf,
    /// Configuration file (defaults to webguard.toml, .webguard.yml or
    /// webguard.json in the project root)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Output format for scan results
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Exit with code 1 if findings of this severity or higher are found
    #[arg(long = "fail-on", value_parser = parse_severity)]
    pub fail_on: Option<Severity>,
    /// Number of worker threads running rules
    #[arg(long, value_parser = parse_threads)]
    pub threads: Option<usize>,
    /// Exclude files matching these globs, relative to the project root
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,
    /// Don't use the default exclusions (vendor/, node_modules/, storage/, ...)
    #[arg(long)]
    pub no_default_exclude: bool,
    /// Maximum file size to analyze (in bytes)
    #[arg(long)]
    pub max_file_size: Option<u64>,
    /// Timeout per rule in milliseconds, 0 disables it
    #[arg(long)]
    pub timeout_rule_ms: Option<u64>,
    /// Run only these rules
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
    /// Don't run these rules
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
    /// Baseline file whose findings are not reported
    #[arg(long)]
    pub baseline: Option<PathBuf>,
    /// Write a baseline file with the current findings
    #[arg(long = "write-baseline")]
    pub write_baseline: Option<PathBuf>,
    /// Disable colors in text output
    #[arg(long)]
    pub no_color: bool,
    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
    /// Suppress non-essential output
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum RulesCmd {
    /// List the built-in rules
    List {
        /// Print the rule metadata as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the details of one rule
    Show {
        /// Rule identifier, e.g. sql-injection
        id: String,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
