use crate::catalog::{docs_url, COPYLEFT_PREFIXES};
use crate::support::Source;
use anyhow::Context;
use engine::text::line_of_offset;
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use loader::RuleOptions;
use serde_json::Value as JsonValue;
use std::path::Path;

/// Composer manifest hygiene: lock file, stability flags, unbounded
/// constraints and licenses.
pub struct DependencyHygiene {
    meta: RuleMetadata,
    copyleft: Vec<String>,
    allowed_licenses: Vec<String>,
    require_license: bool,
}

/// 1-based line of the first occurrence of `needle`, or 1.
fn line_of(text: &str, needle: &str) -> usize {
    text.find(needle).map_or(1, |off| line_of_offset(text, off))
}

fn is_unbounded(constraint: &str) -> bool {
    let c = constraint.trim();
    c == "*" || c.is_empty() || c.starts_with("dev-") || c.contains("@dev")
}

/// Licenses declared by a composer package: a string or a list.
fn licenses(package: &JsonValue) -> Vec<&str> {
    match package.get("license") {
        Some(JsonValue::String(s)) => vec![s.as_str()],
        Some(JsonValue::Array(items)) => items.iter().filter_map(JsonValue::as_str).collect(),
        _ => Vec::new(),
    }
}

impl DependencyHygiene {
    pub const ID: &'static str = "dependency-hygiene";

    pub fn new(options: &RuleOptions) -> Self {
        DependencyHygiene {
            meta: RuleMetadata::new(
                Self::ID,
                "Dependency hygiene",
                Category::Dependencies,
                Severity::Medium,
            )
            .with_description("Composer lock file, stability settings, version constraints and licenses")
            .with_tags(["dependencies", "composer", "supply-chain", "licensing"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(10),
            copyleft: options.str_list_or("copyleft_prefixes", COPYLEFT_PREFIXES),
            allowed_licenses: options.str_list_or("allowed_licenses", &[]),
            require_license: options.bool_or("require_license", true),
        }
    }

    fn is_disallowed(&self, license: &str) -> bool {
        let upper = license.to_ascii_uppercase();
        self.copyleft
            .iter()
            .any(|p| upper.starts_with(&p.to_ascii_uppercase()))
            && !self
                .allowed_licenses
                .iter()
                .any(|a| a.eq_ignore_ascii_case(license))
    }

    fn check_manifest(
        &self,
        src: &Source,
        text: &str,
        manifest: &JsonValue,
        has_lock: bool,
        findings: &mut Vec<Finding>,
    ) {
        if !has_lock {
            findings.push(src.finding(
                Severity::Medium,
                1,
                "composer.lock is missing, so installs are not reproducible",
                "Commit composer.lock for applications.",
            ));
        }

        let stability = manifest.get("minimum-stability").and_then(JsonValue::as_str);
        let prefer_stable = manifest
            .get("prefer-stable")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        if stability.is_some_and(|s| s.eq_ignore_ascii_case("dev")) && !prefer_stable {
            findings.push(src.finding(
                Severity::Medium,
                line_of(text, "\"minimum-stability\""),
                "minimum-stability is dev without prefer-stable",
                "Add \"prefer-stable\": true or raise minimum-stability.",
            ));
        }

        for section in ["require", "require-dev"] {
            let Some(deps) = manifest.get(section).and_then(JsonValue::as_object) else {
                continue;
            };
            for (package, constraint) in deps {
                let Some(constraint) = constraint.as_str() else {
                    continue;
                };
                if is_unbounded(constraint) {
                    findings.push(
                        src.finding(
                            Severity::Low,
                            line_of(text, &format!("\"{package}\"")),
                            format!("{package} is required with the unbounded constraint '{constraint}'"),
                            "Pin a version range such as ^1.2.",
                        )
                        .with_metadata("package", package.as_str())
                        .with_metadata("constraint", constraint),
                    );
                }
            }
        }

        if self.require_license && manifest.get("license").is_none() {
            findings.push(src.finding(
                Severity::Info,
                1,
                "composer.json declares no license",
                "Add a \"license\" field, \"proprietary\" for closed source.",
            ));
        }
    }

    fn check_lock(
        &self,
        ctx: &ScanContext,
        path: &Path,
        findings: &mut Vec<Finding>,
    ) -> anyhow::Result<()> {
        let Some(text) = ctx.read(path) else {
            return Ok(());
        };
        let lock: JsonValue = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", ctx.relative(path).display()))?;
        let src = Source::new(ctx, path);
        for section in ["packages", "packages-dev"] {
            let Some(packages) = lock.get(section).and_then(JsonValue::as_array) else {
                continue;
            };
            for package in packages {
                let Some(name) = package.get("name").and_then(JsonValue::as_str) else {
                    continue;
                };
                for license in licenses(package).into_iter().filter(|l| self.is_disallowed(l)) {
                    findings.push(
                        src.finding(
                            Severity::Medium,
                            line_of(&text, &format!("\"name\": \"{name}\"")),
                            format!("{name} is licensed under {license}"),
                            "Review the copyleft obligations or add the license to allowed_licenses.",
                        )
                        .with_metadata("package", name)
                        .with_metadata("license", license),
                    );
                }
            }
        }
        Ok(())
    }
}

impl Rule for DependencyHygiene {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        ctx.files().composer_json.is_some()
    }

    fn skip_reason(&self) -> String {
        "composer.json not found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let files = ctx.files();
        let Some(path) = &files.composer_json else {
            return Ok(Outcome::skipped(self.skip_reason()));
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest: JsonValue =
            serde_json::from_str(&text).context("Failed to parse composer.json")?;
        let mut findings = Vec::new();
        let src = Source::new(ctx, path);
        self.check_manifest(&src, &text, &manifest, files.composer_lock.is_some(), &mut findings);
        if let Some(lock) = &files.composer_lock {
            self.check_lock(ctx, lock, &mut findings)?;
        }
        Ok(aggregate(
            findings,
            "Composer dependencies are pinned and licensed",
            "{count} dependency hygiene issue(s)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unbounded_constraints() {
        for c in ["*", "dev-main", "^1.0@dev", ""] {
            assert!(is_unbounded(c), "{c}");
        }
        for c in ["^10.0", "~2.1", "1.2.3"] {
            assert!(!is_unbounded(c), "{c}");
        }
    }

    #[test]
    fn copyleft_detection() {
        let options = RuleOptions::new().with("allowed_licenses", json!(["LGPL-3.0-only"]));
        let rule = DependencyHygiene::new(&options);
        assert!(rule.is_disallowed("GPL-3.0-or-later"));
        assert!(rule.is_disallowed("agpl-3.0"));
        assert!(!rule.is_disallowed("LGPL-3.0-only"));
        assert!(!rule.is_disallowed("MIT"));
    }

    #[test]
    fn license_shapes() {
        assert_eq!(licenses(&json!({"license": "MIT"})), vec!["MIT"]);
        assert_eq!(licenses(&json!({"license": ["MIT", "GPL-2.0"]})), vec!["MIT", "GPL-2.0"]);
        assert!(licenses(&json!({})).is_empty());
    }

    #[test]
    fn line_lookup() {
        let text = "{\n  \"require\": {\n    \"php\": \"*\"\n  }\n}";
        assert_eq!(line_of(text, "\"php\""), 3);
        assert_eq!(line_of(text, "\"missing\""), 1);
    }
}
