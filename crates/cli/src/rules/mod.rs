//! `webguard rules`: listing and describing the built-in catalog.

use anyhow::{anyhow, Result};
use colored::*;
use engine::RuleMetadata;
use loader::{ScanConfig, Severity};

use crate::ui::use_colored_output;

fn catalog() -> Vec<RuleMetadata> {
    analyzers::all_rules(&ScanConfig::default())
        .iter()
        .map(|r| r.metadata().clone())
        .collect()
}

fn severity_colored(sev: Severity) -> ColoredString {
    let text = sev.to_string().to_lowercase();
    match sev {
        Severity::Critical => text.bright_red(),
        Severity::High => text.bright_magenta(),
        Severity::Medium => text.bright_yellow(),
        Severity::Low => text.bright_blue(),
        Severity::Info => text.bright_cyan(),
    }
}

pub fn list_rules(json: bool) -> Result<()> {
    let rules = catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }
    colored::control::set_override(use_colored_output(false));
    println!(
        "{:<20} {:<14} {:<10} {}",
        "ID".bold(),
        "CATEGORY".bold(),
        "SEVERITY".bold(),
        "NAME".bold()
    );
    for r in &rules {
        println!(
            "{:<20} {:<14} {:<10} {}",
            r.id.bright_white(),
            r.category.to_string(),
            severity_colored(r.default_severity),
            r.name
        );
    }
    println!("\n{} rules", rules.len());
    Ok(())
}

pub fn show_rule(id: &str) -> Result<()> {
    let rule = catalog()
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow!("unknown rule '{id}' (see `webguard rules list`)"))?;
    colored::control::set_override(use_colored_output(false));
    println!("{}", rule.id.bright_cyan().bold());
    println!("  {} Name: {}", "•".bright_white(), rule.name);
    println!("  {} Category: {}", "•".bright_white(), rule.category);
    println!(
        "  {} Default severity: {}",
        "•".bright_white(),
        severity_colored(rule.default_severity)
    );
    println!("  {} Description: {}", "•".bright_white(), rule.description);
    if !rule.tags.is_empty() {
        let tags: Vec<&str> = rule.tags.iter().map(String::as_str).collect();
        println!("  {} Tags: {}", "•".bright_white(), tags.join(", "));
    }
    if let Some(minutes) = rule.estimated_fix_minutes {
        println!("  {} Estimated fix: {minutes} min", "•".bright_white());
    }
    if let Some(url) = &rule.docs_url {
        println!("  {} Docs: {}", "•".bright_white(), url.bright_green());
    }
    Ok(())
}
