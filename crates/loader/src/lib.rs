//! Loads scan configuration and discovers the files of a Laravel project.
//!
//! Also home of [`Severity`], shared by every crate that reports findings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod walk;
pub use walk::visit;

pub mod config;
pub mod discovery;
pub mod excludes;

pub use config::{find_config, load_config, RuleOptions, ScanConfig, CONFIG_FILE_NAMES};
pub use discovery::{classify, FileRole, ProjectFiles};
pub use excludes::{
    glob_to_regex, parse_exclude, Excludes, DEFAULT_EXCLUDES, DEFAULT_MAX_FILE_SIZE, IGNORE_FILE,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
/// Severity associated with a rule or finding, ordered from least to most
/// severe.
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Medium),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}
