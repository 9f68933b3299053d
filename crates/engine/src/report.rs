use crate::finding::Finding;
use crate::outcome::Outcome;
use crate::rule::RuleMetadata;
use anyhow::Context;
use loader::Severity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Outcome of one rule together with its metadata and run time.
pub struct RuleReport {
    pub metadata: RuleMetadata,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Result of a scan: one entry per rule in catalog order.
pub struct ScanReport {
    pub root: PathBuf,
    pub results: Vec<RuleReport>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Number of rules that ended in each state.
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub warning: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl ScanReport {
    /// All findings in rule order, then discovery order.
    pub fn findings(&self) -> Vec<&Finding> {
        self.results
            .iter()
            .flat_map(|r| r.outcome.findings())
            .collect()
    }

    /// Number of findings per severity. Severities without findings are
    /// absent.
    pub fn counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for f in self.findings() {
            *counts.entry(f.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut c = StatusCounts::default();
        for r in &self.results {
            match r.outcome {
                Outcome::Passed { .. } => c.passed += 1,
                Outcome::Failed { .. } => c.failed += 1,
                Outcome::Warning { .. } => c.warning += 1,
                Outcome::Skipped { .. } => c.skipped += 1,
                Outcome::Errored { .. } => c.errored += 1,
            }
        }
        c
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.findings().iter().map(|f| f.severity).max()
    }

    pub fn has_findings_at_or_above(&self, threshold: Severity) -> bool {
        self.max_severity().is_some_and(|s| s >= threshold)
    }

    pub fn result(&self, rule_id: &str) -> Option<&RuleReport> {
        self.results.iter().find(|r| r.metadata.id == rule_id)
    }

    /// Drops baselined findings, re-aggregating affected outcomes.
    pub fn apply_baseline(&mut self, baseline: &HashSet<String>) {
        for r in &mut self.results {
            let outcome = std::mem::replace(&mut r.outcome, Outcome::passed(""));
            r.outcome = outcome.retain(|f| !baseline.contains(&f.id));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Minimal entry to represent a finding in a baseline.
pub struct BaselineEntry {
    /// Finding fingerprint.
    pub id: String,
    pub rule_id: String,
    pub file: PathBuf,
    pub line: usize,
}

impl From<&Finding> for BaselineEntry {
    fn from(f: &Finding) -> Self {
        BaselineEntry {
            id: f.id.clone(),
            rule_id: f.rule_id.clone(),
            file: f.location.file.clone(),
            line: f.location.line,
        }
    }
}

/// Reads the fingerprints stored in a baseline file.
pub fn load_baseline(path: &Path) -> anyhow::Result<HashSet<String>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read baseline {}", path.display()))?;
    let entries: Vec<BaselineEntry> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse baseline {}", path.display()))?;
    Ok(entries.into_iter().map(|e| e.id).collect())
}

pub fn write_baseline(path: &Path, findings: &[&Finding]) -> anyhow::Result<()> {
    let entries: Vec<BaselineEntry> = findings.iter().map(|f| BaselineEntry::from(*f)).collect();
    let data = serde_json::to_string_pretty(&entries)?;
    fs::write(path, data)
        .with_context(|| format!("Failed to write baseline {}", path.display()))?;
    Ok(())
}
