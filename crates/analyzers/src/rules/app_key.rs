use crate::catalog::{docs_url, APP_KEY_PLACEHOLDERS};
use crate::support::Source;
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use loader::RuleOptions;
use std::path::Path;

/// Bytes of key material AES-256-CBC needs.
const KEY_BYTES: usize = 32;

/// Missing, placeholder or short `APP_KEY` values in dotenv files.
pub struct AppKey {
    meta: RuleMetadata,
    placeholders: Vec<String>,
    min_length: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum KeyProblem {
    Missing,
    Empty,
    Placeholder,
    Short(usize),
}

impl AppKey {
    pub const ID: &'static str = "app-key";

    pub fn new(options: &RuleOptions) -> Self {
        AppKey {
            meta: RuleMetadata::new(Self::ID, "Application key", Category::Config, Severity::Critical)
                .with_description("APP_KEY must be set to a random 32 byte key")
                .with_tags(["security", "configuration", "crypto"])
                .with_docs_url(&docs_url(Self::ID))
                .with_fix_minutes(2),
            placeholders: options.str_list_or("placeholders", APP_KEY_PLACEHOLDERS),
            min_length: options.u64_or("min_length", KEY_BYTES as u64) as usize,
        }
    }

    fn classify(&self, value: Option<&str>) -> Option<KeyProblem> {
        let Some(value) = value.map(str::trim) else {
            return Some(KeyProblem::Missing);
        };
        if value.is_empty() {
            return Some(KeyProblem::Empty);
        }
        if self.placeholders.iter().any(|p| p.eq_ignore_ascii_case(value)) {
            return Some(KeyProblem::Placeholder);
        }
        let bytes = match value.strip_prefix("base64:") {
            Some(encoded) => {
                let padding = encoded.chars().rev().take_while(|&c| c == '=').count();
                (encoded.len() * 3 / 4).saturating_sub(padding)
            }
            None => value.len(),
        };
        (bytes < self.min_length).then_some(KeyProblem::Short(bytes))
    }

    fn check_env(&self, ctx: &ScanContext, path: &Path, findings: &mut Vec<Finding>) {
        let Some(env) = ctx.env(path) else {
            return;
        };
        let entry = env.get("APP_KEY");
        let Some(problem) = self.classify(entry.map(|e| e.value.as_str())) else {
            return;
        };
        let line = entry.map_or(1, |e| e.line);
        let src = Source::new(ctx, path);
        let rec = "Generate a key with `php artisan key:generate` and keep it out of version control.";
        let finding = match problem {
            KeyProblem::Missing => src.finding(Severity::Critical, line, "APP_KEY is not set", rec),
            KeyProblem::Empty => src.finding(Severity::Critical, line, "APP_KEY is empty", rec),
            KeyProblem::Placeholder => src.finding(
                Severity::Critical,
                line,
                "APP_KEY holds a placeholder value",
                rec,
            ),
            KeyProblem::Short(bytes) => src
                .finding(
                    Severity::High,
                    line,
                    format!(
                        "APP_KEY is {bytes} byte(s) long, shorter than the {} bytes the cipher needs",
                        self.min_length
                    ),
                    rec,
                )
                .with_metadata("bytes", bytes),
        };
        findings.push(finding);
    }
}

impl Rule for AppKey {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        !ctx.files().env.is_empty()
    }

    fn skip_reason(&self) -> String {
        "no .env file found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let mut findings = Vec::new();
        for path in &ctx.files().env {
            self.check_env(ctx, path, &mut findings);
        }
        Ok(aggregate(
            findings,
            "APP_KEY is set",
            "{count} application key issue(s)",
        ))
    }
}
