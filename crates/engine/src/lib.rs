//! Rule execution engine: the rule contract and lifecycle, the finding and
//! outcome model, and the scan orchestrator that runs a catalog of rules
//! in parallel over one project.

use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use std::collections::HashSet;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

mod context;
mod finding;
mod outcome;
mod report;
mod rule;
pub mod text;

pub use context::ScanContext;
pub use finding::{Finding, FindingSet, Location};
pub use loader::Severity;
pub use outcome::{aggregate, Outcome, FAIL_THRESHOLD};
pub use report::{
    load_baseline, write_baseline, BaselineEntry, RuleReport, ScanReport, StatusCounts,
};
pub use rule::{run_rule, Category, Rule, RuleMetadata, RuleRun, RuleState};

/// Message of the outcome recorded for a rule that exceeded its budget.
pub const TIMEOUT_MESSAGE: &str = "timeout";

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Worker threads; `None` uses rayon's global pool.
    pub threads: Option<usize>,
    /// Wall-clock budget per rule. Zero disables the budget.
    pub rule_timeout: Option<Duration>,
    /// Fingerprints of findings to drop from the report.
    pub baseline: Option<HashSet<String>>,
}

/// Runs a catalog of rules against a [`ScanContext`].
pub struct Engine {
    rules: Vec<Arc<dyn Rule>>,
    config: EngineConfig,
    pool: Option<ThreadPool>,
}

impl Engine {
    pub fn new(rules: Vec<Arc<dyn Rule>>, config: EngineConfig) -> anyhow::Result<Self> {
        let pool = match config.threads {
            Some(n) if n > 0 => Some(ThreadPoolBuilder::new().num_threads(n).build()?),
            _ => None,
        };
        Ok(Engine {
            rules,
            config,
            pool,
        })
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Runs every rule and collects the outcomes in catalog order.
    pub fn run(&self, ctx: Arc<ScanContext>) -> ScanReport {
        let start = Instant::now();
        info!(
            root = %ctx.root().display(),
            rules = self.rules.len(),
            "Starting scan"
        );
        let evaluate = || -> Vec<RuleReport> {
            self.rules
                .par_iter()
                .map(|rule| self.run_one(rule, &ctx))
                .collect()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(evaluate),
            None => evaluate(),
        };

        let mut report = ScanReport {
            root: ctx.root().to_path_buf(),
            results,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        if let Some(baseline) = &self.config.baseline {
            report.apply_baseline(baseline);
        }
        let counts = report.status_counts();
        info!(
            passed = counts.passed,
            failed = counts.failed,
            warning = counts.warning,
            skipped = counts.skipped,
            errored = counts.errored,
            findings = report.findings().len(),
            time_ms = report.duration_ms,
            "Scan finished"
        );
        report
    }

    fn run_one(&self, rule: &Arc<dyn Rule>, ctx: &Arc<ScanContext>) -> RuleReport {
        let metadata = rule.metadata().clone();
        let start = Instant::now();
        let outcome = match self.config.rule_timeout {
            Some(budget) if !budget.is_zero() => run_with_timeout(rule, ctx, budget),
            _ => run_rule(rule.as_ref(), ctx),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(rule = %metadata.id, status = outcome.label(), time_ms = duration_ms, "Rule evaluated");
        RuleReport {
            metadata,
            outcome,
            duration_ms,
        }
    }
}

/// Evaluates the rule on a worker thread; when the budget expires the
/// worker is abandoned and the rule reports `Errored("timeout")`.
fn run_with_timeout(rule: &Arc<dyn Rule>, ctx: &Arc<ScanContext>, budget: Duration) -> Outcome {
    let (tx, rx) = mpsc::channel();
    let rule_cloned = Arc::clone(rule);
    let ctx_cloned = Arc::clone(ctx);
    let id = rule.metadata().id.clone();
    let spawned = thread::Builder::new()
        .name(format!("rule-{id}"))
        .spawn(move || {
            let outcome = run_rule(rule_cloned.as_ref(), &ctx_cloned);
            let _ = tx.send(outcome);
        });
    if let Err(e) = spawned {
        warn!(rule = %id, error = %e, "Failed to spawn rule worker");
        return Outcome::errored(format!("failed to spawn rule worker: {e}"));
    }
    match rx.recv_timeout(budget) {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(rule = %id, budget_ms = budget.as_millis() as u64, "Rule timed out");
            Outcome::errored(TIMEOUT_MESSAGE)
        }
    }
}
