#![allow(dead_code)]

use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use loader::{Excludes, ProjectFiles, ScanConfig};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn finding(severity: Severity, line: usize) -> Finding {
    Finding::new(
        severity,
        format!("issue at {line}"),
        "app/Http/Controllers/UserController.php",
        line,
        "fix it",
    )
}

pub fn context(root: &Path) -> ScanContext {
    let files = ProjectFiles::discover(root, &Excludes::with_defaults()).unwrap();
    ScanContext::new(files, Excludes::with_defaults(), ScanConfig::default())
}

pub enum Behaviour {
    Report(Vec<Severity>),
    Findings(Vec<Finding>),
    Error,
    Panic,
    Sleep(Duration),
    NotApplicable,
}

/// Rule with scripted behaviour.
pub struct Scripted {
    pub meta: RuleMetadata,
    pub behaviour: Behaviour,
    pub calls: AtomicUsize,
}

impl Scripted {
    pub fn new(id: &str, behaviour: Behaviour) -> Self {
        Scripted {
            meta: RuleMetadata::new(id, id, Category::Security, Severity::Medium),
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Rule for Scripted {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, _ctx: &ScanContext) -> bool {
        !matches!(self.behaviour, Behaviour::NotApplicable)
    }

    fn execute(&self, _ctx: &ScanContext) -> anyhow::Result<Outcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Report(sevs) => {
                let findings = sevs
                    .iter()
                    .enumerate()
                    .map(|(i, s)| finding(*s, i + 1))
                    .collect();
                Ok(aggregate(findings, "clean", "{count} issue(s)"))
            }
            Behaviour::Findings(findings) => {
                Ok(aggregate(findings.clone(), "clean", "{count} issue(s)"))
            }
            Behaviour::Error => anyhow::bail!("config/app.php is unreadable"),
            Behaviour::Panic => panic!("index out of range"),
            Behaviour::Sleep(d) => {
                std::thread::sleep(*d);
                Ok(Outcome::passed("slow but clean"))
            }
            Behaviour::NotApplicable => unreachable!("never executed"),
        }
    }
}
