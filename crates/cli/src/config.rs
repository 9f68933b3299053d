//! Builds the effective [`ScanConfig`]: the project configuration file,
//! overridden by command-line flags.

use anyhow::{bail, Context, Result};
use loader::{find_config, load_config, ScanConfig, Severity};
use std::path::Path;
use tracing::debug;

use crate::args::ScanArgs;

/// Loads `--config`, or the first configuration file found in `root`, or
/// the defaults.
pub fn base_config(args: &ScanArgs, root: &Path) -> Result<ScanConfig> {
    let path = match &args.config {
        Some(p) => Some(p.clone()),
        None => find_config(root),
    };
    match path {
        Some(p) => load_config(&p),
        None => {
            debug!(root = %root.display(), "No configuration file found");
            Ok(ScanConfig::default())
        }
    }
}

fn check_rule_ids(ids: &[String], known: &[String], flag: &str) -> Result<()> {
    for id in ids {
        if !known.contains(id) {
            bail!("unknown rule '{id}' in {flag} (see `webguard rules list`)");
        }
    }
    Ok(())
}

/// Applies the command-line flags on top of `cfg`.
pub fn apply_overrides(mut cfg: ScanConfig, args: &ScanArgs, known: &[String]) -> Result<ScanConfig> {
    check_rule_ids(&args.only, known, "--only")?;
    check_rule_ids(&args.skip, known, "--skip")?;

    cfg.exclude.extend(args.exclude.iter().cloned());
    if args.no_default_exclude {
        cfg.no_default_excludes = true;
    }
    if !args.only.is_empty() {
        cfg.enabled_rules = args.only.clone();
    }
    cfg.disabled_rules.extend(args.skip.iter().cloned());
    if let Some(ms) = args.timeout_rule_ms {
        cfg.rule_timeout_ms = Some(ms);
    }
    if let Some(n) = args.threads {
        cfg.threads = Some(n);
    }
    if let Some(size) = args.max_file_size {
        cfg.max_file_size = Some(size);
    }
    if let Some(sev) = args.fail_on {
        cfg.fail_on = Some(sev.to_string());
    }
    // Surfaces a bad `fail_on` from the config file before scanning.
    cfg.fail_on_severity()
        .context("Invalid fail_on in configuration")?;
    Ok(cfg)
}

/// Threshold from `--fail-on` or the configuration file.
pub fn fail_threshold(cfg: &ScanConfig) -> Result<Option<Severity>> {
    cfg.fail_on_severity()
}
