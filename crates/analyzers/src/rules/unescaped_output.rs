use crate::catalog::{docs_url, SAFE_RAW_OUTPUT, TAINT_HINTS};
use crate::support::Source;
use engine::text::{column_of_offset, line_of_offset};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use loader::RuleOptions;
use regex::Regex;

/// Blade `{!! ... !!}` echoes, which bypass HTML escaping.
pub struct UnescapedOutput {
    meta: RuleMetadata,
    taint_hints: Vec<String>,
    safe: Vec<String>,
}

impl UnescapedOutput {
    pub const ID: &'static str = "unescaped-output";

    pub fn new(options: &RuleOptions) -> Self {
        UnescapedOutput {
            meta: RuleMetadata::new(
                Self::ID,
                "Unescaped Blade output",
                Category::Security,
                Severity::Medium,
            )
            .with_description("Raw {!! !!} echoes in Blade templates")
            .with_tags(["security", "xss", "blade", "owasp-a03"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(10),
            taint_hints: options.str_list_or("taint_hints", TAINT_HINTS),
            safe: options.str_list_or("safe_expressions", SAFE_RAW_OUTPUT),
        }
    }

    /// Whether `expr` is one of the trusted expressions. A trusted name
    /// only covers longer expressions across an identifier boundary, so
    /// `$slot` matches `$slot->toHtml()` but not `$slotHtml`.
    fn is_safe(&self, expr: &str) -> bool {
        self.safe.iter().any(|s| match expr.strip_prefix(s.as_str()) {
            Some(rest) => !s.ends_with(is_ident_char) || !rest.starts_with(is_ident_char),
            None => false,
        })
    }

    fn is_tainted(&self, expr: &str) -> bool {
        self.taint_hints.iter().any(|h| expr.contains(h.as_str()))
    }

    fn check_view(&self, src: &Source, text: &str, echo: &Regex, findings: &mut Vec<Finding>) {
        for caps in echo.captures_iter(text) {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let expr = expr.as_str().trim();
            if expr.is_empty() || self.is_safe(expr) {
                continue;
            }
            let line = line_of_offset(text, whole.start());
            let column = column_of_offset(text, whole.start());
            let finding = if self.is_tainted(expr) {
                src.finding(
                    Severity::High,
                    line,
                    format!("Request input echoed without escaping: {{!! {expr} !!}}"),
                    "Use {{ }} or sanitize the value before echoing it raw.",
                )
            } else {
                src.finding(
                    Severity::Medium,
                    line,
                    format!("Unescaped output: {{!! {expr} !!}}"),
                    "Prefer {{ }}; keep {!! !!} for trusted, already-sanitized HTML.",
                )
            };
            findings.push(
                finding
                    .with_column(column)
                    .with_metadata("expression", expr),
            );
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Rule for UnescapedOutput {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        !ctx.files().views.is_empty()
    }

    fn skip_reason(&self) -> String {
        "no Blade views found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let echo = Regex::new(r"(?s)\{!!\s*(.*?)\s*!!\}")?;
        let mut findings = Vec::new();
        for view in &ctx.files().views {
            let Some(text) = ctx.read(view) else {
                continue;
            };
            self.check_view(&Source::new(ctx, view), &text, &echo, &mut findings);
        }
        Ok(aggregate(
            findings,
            "Blade templates escape their output",
            "{count} unescaped echo(es) in Blade templates",
        ))
    }
}
