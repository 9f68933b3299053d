use crate::finding::{dedup_findings, Finding, FindingSet};
use loader::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity from which a non-empty finding list fails the rule.
pub const FAIL_THRESHOLD: Severity = Severity::High;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Result of running one rule against a project.
pub enum Outcome {
    Passed { summary: String },
    Failed { summary: String, findings: FindingSet },
    Warning { summary: String, findings: FindingSet },
    Skipped { reason: String },
    Errored { message: String },
}

impl Outcome {
    pub fn passed(summary: impl Into<String>) -> Self {
        Outcome::Passed {
            summary: summary.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Outcome::Errored {
            message: message.into(),
        }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            Outcome::Failed { findings, .. } | Outcome::Warning { findings, .. } => {
                findings.as_slice()
            }
            _ => &[],
        }
    }

    /// Summary, skip reason or error message.
    pub fn message(&self) -> &str {
        match self {
            Outcome::Passed { summary }
            | Outcome::Failed { summary, .. }
            | Outcome::Warning { summary, .. } => summary,
            Outcome::Skipped { reason } => reason,
            Outcome::Errored { message } => message,
        }
    }

    pub fn max_severity(&self) -> Option<Severity> {
        match self {
            Outcome::Failed { findings, .. } | Outcome::Warning { findings, .. } => {
                Some(findings.max_severity())
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed { .. } => "PASSED",
            Outcome::Failed { .. } => "FAILED",
            Outcome::Warning { .. } => "WARNING",
            Outcome::Skipped { .. } => "SKIPPED",
            Outcome::Errored { .. } => "ERRORED",
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored { .. })
    }

    pub(crate) fn findings_mut(&mut self) -> Option<&mut Vec<Finding>> {
        match self {
            Outcome::Failed { findings, .. } | Outcome::Warning { findings, .. } => {
                Some(findings.as_mut_vec())
            }
            _ => None,
        }
    }

    /// Drops findings rejected by `keep` and re-aggregates. Outcomes that
    /// lose nothing are returned unchanged.
    pub fn retain<F>(self, mut keep: F) -> Outcome
    where
        F: FnMut(&Finding) -> bool,
    {
        let (summary, findings) = match self {
            Outcome::Failed { summary, findings } | Outcome::Warning { summary, findings } => {
                (summary, findings)
            }
            other => return other,
        };
        let total = findings.len();
        let kept: Vec<Finding> = findings.into_vec().into_iter().filter(|f| keep(f)).collect();
        let removed = total - kept.len();
        if removed == 0 {
            return aggregate(kept, "", &summary);
        }
        aggregate(
            kept,
            &format!("all {removed} finding(s) baselined"),
            &format!("{{count}} finding(s) remaining ({removed} baselined)"),
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message())
    }
}

/// Folds a rule's findings into its outcome.
///
/// Repeated findings (same message, file, line and column) are kept once.
/// No findings pass with `passed_summary`. Otherwise the rule fails when
/// the most severe finding is at least [`FAIL_THRESHOLD`] and warns below
/// it; `{count}` in `failed_template` is replaced by the number of findings.
///
/// # Example
/// ```
/// use engine::{aggregate, Finding, Outcome};
/// use loader::Severity;
///
/// let f = Finding::new(Severity::High, "raw query", "app/a.php", 3, "bind it");
/// let out = aggregate(vec![f], "clean", "{count} raw queries");
/// assert!(matches!(out, Outcome::Failed { ref summary, .. } if summary == "1 raw queries"));
/// assert!(aggregate(vec![], "clean", "{count}").is_passed());
/// ```
pub fn aggregate(
    mut findings: Vec<Finding>,
    passed_summary: &str,
    failed_template: &str,
) -> Outcome {
    dedup_findings(&mut findings);
    let count = findings.len();
    let Some(findings) = FindingSet::new(findings) else {
        return Outcome::passed(passed_summary);
    };
    let summary = failed_template.replace("{count}", &count.to_string());
    if findings.max_severity() >= FAIL_THRESHOLD {
        Outcome::Failed { summary, findings }
    } else {
        Outcome::Warning { summary, findings }
    }
}
