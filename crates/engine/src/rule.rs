use crate::context::ScanContext;
use crate::outcome::Outcome;
use loader::Severity;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Security,
    Config,
    Dependencies,
    Quality,
    Performance,
    BestPractice,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Security => "security",
            Category::Config => "config",
            Category::Dependencies => "dependencies",
            Category::Quality => "quality",
            Category::Performance => "performance",
            Category::BestPractice => "best-practice",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Static description of a rule.
pub struct RuleMetadata {
    /// Unique, kebab-case identifier.
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub default_severity: Severity,
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fix_minutes: Option<u32>,
}

impl RuleMetadata {
    pub fn new(id: &str, name: &str, category: Category, default_severity: Severity) -> Self {
        RuleMetadata {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            default_severity,
            tags: BTreeSet::new(),
            docs_url: None,
            estimated_fix_minutes: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_docs_url(mut self, url: &str) -> Self {
        self.docs_url = Some(url.to_string());
        self
    }

    pub fn with_fix_minutes(mut self, minutes: u32) -> Self {
        self.estimated_fix_minutes = Some(minutes);
        self
    }
}

/// A check run once per scan against a [`ScanContext`].
///
/// Implementations hold no per-scan state: everything mutable lives inside
/// a single `execute` call, so the same context always yields the same
/// outcome.
pub trait Rule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;

    /// Cheap applicability test over the discovered file lists.
    fn applies(&self, ctx: &ScanContext) -> bool;

    /// Reason reported when [`Rule::applies`] is false.
    fn skip_reason(&self) -> String {
        format!("no files relevant to {}", self.metadata().name)
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleState {
    Idle,
    Skipped,
    Running,
    Passed,
    Failed,
    Warning,
    Errored,
}

impl RuleState {
    pub fn can_transition_to(self, next: RuleState) -> bool {
        use RuleState::*;
        matches!(
            (self, next),
            (Idle, Skipped) | (Idle, Running) | (Running, Passed | Failed | Warning | Errored)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RuleState::Idle | RuleState::Running)
    }
}

impl From<&Outcome> for RuleState {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Passed { .. } => RuleState::Passed,
            Outcome::Failed { .. } => RuleState::Failed,
            Outcome::Warning { .. } => RuleState::Warning,
            Outcome::Skipped { .. } => RuleState::Skipped,
            Outcome::Errored { .. } => RuleState::Errored,
        }
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Drives one rule through its [`RuleState`] transitions.
#[derive(Debug)]
pub struct RuleRun<'a> {
    rule_id: &'a str,
    state: RuleState,
}

impl<'a> RuleRun<'a> {
    pub fn new(rule_id: &'a str) -> Self {
        RuleRun {
            rule_id,
            state: RuleState::Idle,
        }
    }

    pub fn state(&self) -> RuleState {
        self.state
    }

    /// Moves to `next`, refusing illegal edges.
    pub fn advance(&mut self, next: RuleState) -> Result<(), String> {
        if !self.state.can_transition_to(next) {
            return Err(format!(
                "illegal rule state transition {} -> {}",
                self.state, next
            ));
        }
        debug!(rule = self.rule_id, from = %self.state, to = %next, "Rule state");
        self.state = next;
        Ok(())
    }

    /// Records the final outcome. An outcome that cannot follow the
    /// current state becomes `Errored`.
    pub fn finish(&mut self, outcome: Outcome) -> Outcome {
        match self.advance(RuleState::from(&outcome)) {
            Ok(()) => outcome,
            Err(e) => {
                warn!(rule = self.rule_id, error = %e, "Rule produced an invalid outcome");
                if self.state == RuleState::Idle {
                    let _ = self.advance(RuleState::Running);
                }
                let _ = self.advance(RuleState::Errored);
                Outcome::errored(e)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("rule panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("rule panicked: {s}")
    } else {
        "rule panicked".to_string()
    }
}

/// Runs `rule` in isolation. Errors and panics become
/// [`Outcome::Errored`]; findings get their rule id and fingerprint.
pub fn run_rule(rule: &dyn Rule, ctx: &ScanContext) -> Outcome {
    let id = rule.metadata().id.as_str();
    let mut run = RuleRun::new(id);

    let applies = match catch_unwind(AssertUnwindSafe(|| rule.applies(ctx))) {
        Ok(applies) => applies,
        Err(payload) => {
            let _ = run.advance(RuleState::Running);
            return run.finish(Outcome::errored(panic_message(payload)));
        }
    };
    if !applies {
        return run.finish(Outcome::skipped(rule.skip_reason()));
    }

    let _ = run.advance(RuleState::Running);
    let mut outcome = match catch_unwind(AssertUnwindSafe(|| rule.execute(ctx))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!(rule = id, error = %e, "Rule failed");
            Outcome::errored(format!("{e:#}"))
        }
        Err(payload) => {
            let msg = panic_message(payload);
            warn!(rule = id, error = %msg, "Rule panicked");
            Outcome::errored(msg)
        }
    };
    if let Some(findings) = outcome.findings_mut() {
        for f in findings.iter_mut() {
            f.stamp(id);
        }
    }
    run.finish(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        use RuleState::*;
        assert!(Idle.can_transition_to(Skipped));
        assert!(Idle.can_transition_to(Running));
        for end in [Passed, Failed, Warning, Errored] {
            assert!(Running.can_transition_to(end));
            assert!(!Idle.can_transition_to(end));
            assert!(end.is_terminal());
        }
        assert!(!Running.can_transition_to(Skipped));
        assert!(!Skipped.can_transition_to(Running));
        assert!(!Passed.can_transition_to(Failed));
        assert!(!Running.is_terminal());
    }

    #[test]
    fn run_rejects_illegal_outcome() {
        let mut run = RuleRun::new("demo");
        run.advance(RuleState::Running).unwrap();
        let out = run.finish(Outcome::skipped("late"));
        assert!(out.is_errored());
        assert_eq!(run.state(), RuleState::Errored);
        assert!(run.advance(RuleState::Running).is_err());
    }

    #[test]
    fn metadata_builder() {
        let meta = RuleMetadata::new("demo", "Demo", Category::Quality, Severity::Low)
            .with_description("demo rule")
            .with_tags(["b", "a", "b"])
            .with_fix_minutes(5);
        assert_eq!(meta.tags.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(meta.estimated_fix_minutes, Some(5));
        assert_eq!(Category::BestPractice.to_string(), "best-practice");
    }
}
