//! Conversion of a scan report to SARIF 2.1.0.

use crate::TOOL_NAME;
use engine::{Finding, RuleMetadata, ScanReport};
use loader::Severity;
use serde_sarif::sarif;
use std::collections::BTreeMap;

fn level(sev: Severity) -> sarif::ResultLevel {
    match sev {
        Severity::Info | Severity::Low => sarif::ResultLevel::Note,
        Severity::Medium => sarif::ResultLevel::Warning,
        Severity::High | Severity::Critical => sarif::ResultLevel::Error,
    }
}

fn descriptor(meta: &RuleMetadata) -> sarif::ReportingDescriptor {
    let builder = sarif::ReportingDescriptor::builder()
        .id(meta.id.clone())
        .name(meta.name.clone())
        .short_description(
            sarif::MultiformatMessageString::builder()
                .text(meta.description.clone())
                .build(),
        );
    match &meta.docs_url {
        Some(url) => builder.help_uri(url.clone()).build(),
        None => builder.build(),
    }
}

fn result(f: &Finding) -> sarif::Result {
    let region = match f.location.column {
        Some(col) => sarif::Region::builder()
            .start_line(f.line() as i64)
            .start_column(col as i64)
            .build(),
        None => sarif::Region::builder().start_line(f.line() as i64).build(),
    };
    let location = sarif::Location::builder()
        .physical_location(
            sarif::PhysicalLocation::builder()
                .artifact_location(
                    sarif::ArtifactLocation::builder()
                        .uri(f.file().to_string_lossy().replace('\\', "/"))
                        .build(),
                )
                .region(region)
                .build(),
        )
        .build();
    let fingerprints = BTreeMap::from([("webguard/v1".to_string(), f.id.clone())]);

    sarif::Result::builder()
        .rule_id(f.rule_id.clone())
        .message(sarif::Message::builder().text(f.message.clone()).build())
        .level(level(f.severity))
        .locations(vec![location])
        .partial_fingerprints(fingerprints)
        .build()
}

/// One run with every rule of the report as a descriptor and every
/// finding as a result.
pub fn to_sarif(report: &ScanReport) -> sarif::Sarif {
    let rules: Vec<sarif::ReportingDescriptor> =
        report.results.iter().map(|r| descriptor(&r.metadata)).collect();
    let results: Vec<sarif::Result> = report.findings().into_iter().map(result).collect();

    sarif::Sarif::builder()
        .version(serde_json::json!("2.1.0"))
        .schema(sarif::SCHEMA_URL.to_string())
        .runs(vec![sarif::Run::builder()
            .tool(
                sarif::Tool::builder()
                    .driver(
                        sarif::ToolComponent::builder()
                            .name(TOOL_NAME)
                            .version(env!("CARGO_PKG_VERSION"))
                            .rules(rules)
                            .build(),
                    )
                    .build(),
            )
            .results(results)
            .build()])
        .build()
}
