use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::args::ScanArgs;
use crate::config::{apply_overrides, base_config, fail_threshold};
use crate::output::{self, Format};
use crate::ui;

use engine::{Engine, EngineConfig, ScanContext, ScanReport};

/// Scans `args.path` and prints the report. Returns whether findings at or
/// above the fail threshold were reported.
pub fn run_scan(args: &ScanArgs) -> Result<bool> {
    if args.debug && !args.quiet {
        debug!("Debug mode enabled");
    }
    if args.format == Format::Text && !args.quiet && args.output.is_none() {
        ui::print_header();
    }

    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.path.display()))?;
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    info!(root = %root.display(), "Scan started");

    let known = analyzers::rule_ids();
    let config = apply_overrides(base_config(args, &root)?, args, &known)?;
    let fail_on = fail_threshold(&config)?;
    let rules = analyzers::default_rules(&config);
    debug!(rules = rules.len(), "Rules loaded");

    let baseline = args
        .baseline
        .as_deref()
        .map(engine::load_baseline)
        .transpose()?;
    if let Some(b) = &baseline {
        debug!(entries = b.len(), "Baseline loaded");
    }
    let engine_config = EngineConfig {
        threads: config.threads,
        rule_timeout: config.rule_timeout_ms.map(Duration::from_millis),
        baseline,
    };

    let ctx = ScanContext::discover(&root, config)?;
    let files = ctx.files();
    debug!(
        php = files.php.len(),
        routes = files.routes.len(),
        views = files.views.len(),
        env = files.env.len(),
        "Files discovered"
    );
    let ctx = Arc::new(ctx);
    let report = Engine::new(rules, engine_config)?.run(Arc::clone(&ctx));
    log_parser_metrics(&ctx);
    warn_errored(&report);

    if let Some(path) = &args.write_baseline {
        engine::write_baseline(path, &report.findings())?;
        info!(path = %path.display(), findings = report.findings().len(), "Baseline written");
    }

    let color = args.output.is_none() && ui::use_colored_output(args.no_color);
    output::emit(&report, args.format, args.output.as_deref(), color)?;
    if !args.quiet {
        ui::print_verdict(&report, fail_on, color);
    }

    let failed = fail_on.is_some_and(|t| report.has_findings_at_or_above(t));
    info!(
        findings = report.findings().len(),
        failed,
        "Scan completed"
    );
    Ok(failed)
}

fn log_parser_metrics(ctx: &ScanContext) {
    let m = ctx.parser_metrics();
    debug!(
        parsed = m.files_parsed,
        errors = m.parse_errors,
        "Parser metrics"
    );
}

fn warn_errored(report: &ScanReport) {
    for r in &report.results {
        if r.outcome.is_errored() {
            warn!(rule = %r.metadata.id, error = r.outcome.message(), "Rule errored");
        }
    }
}
