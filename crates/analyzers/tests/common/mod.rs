#![allow(dead_code)]

use engine::{run_rule, Finding, Outcome, Rule, ScanContext, Severity};
use loader::ScanConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Writes a Laravel-shaped project into a temporary directory.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

pub fn scan(rule: &dyn Rule, root: &Path) -> Outcome {
    let ctx = ScanContext::discover(root, ScanConfig::default()).unwrap();
    run_rule(rule, &ctx)
}

pub fn with_message<'a>(outcome: &'a Outcome, needle: &str) -> Vec<&'a Finding> {
    outcome
        .findings()
        .iter()
        .filter(|f| f.message.contains(needle))
        .collect()
}

pub fn severities(outcome: &Outcome) -> Vec<Severity> {
    outcome.findings().iter().map(|f| f.severity).collect()
}
