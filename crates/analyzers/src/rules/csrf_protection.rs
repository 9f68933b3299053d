use crate::catalog::{docs_url, CSRF_MARKERS, DEFAULT_FORM_SCAN_LINES};
use crate::support::{php_trees, Source};
use engine::text::{balanced_region_end_str, line_of_offset};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{class_matches, Node, SyntaxNode};
use loader::RuleOptions;
use regex::Regex;

const CSRF_MIDDLEWARE: &[&str] = &["VerifyCsrfToken", "ValidateCsrfToken"];

/// Routes excluded from CSRF verification and state-changing Blade forms
/// rendered without a token.
pub struct CsrfProtection {
    meta: RuleMetadata,
    markers: Vec<String>,
    scan_lines: usize,
}

impl CsrfProtection {
    pub const ID: &'static str = "csrf-protection";

    pub fn new(options: &RuleOptions) -> Self {
        CsrfProtection {
            meta: RuleMetadata::new(Self::ID, "CSRF protection", Category::Security, Severity::High)
                .with_description("CSRF verification exemptions and forms missing @csrf")
                .with_tags(["security", "csrf", "blade", "owasp-a01"])
                .with_docs_url(&docs_url(Self::ID))
                .with_fix_minutes(5),
            markers: options
                .str_list_or("markers", CSRF_MARKERS)
                .into_iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
            scan_lines: options.u64_or("form_scan_lines", DEFAULT_FORM_SCAN_LINES) as usize,
        }
    }

    fn is_csrf_middleware(name: &str, extends: Option<&str>) -> bool {
        CSRF_MIDDLEWARE
            .iter()
            .any(|m| class_matches(name, m) || extends.is_some_and(|e| class_matches(e, m)))
    }

    fn check_exemptions(&self, src: &Source, class: &SyntaxNode, findings: &mut Vec<Finding>) {
        let Node::Class {
            name,
            extends,
            members,
            ..
        } = &class.node
        else {
            return;
        };
        if !Self::is_csrf_middleware(name, extends.as_deref()) {
            return;
        }
        let items = members.iter().find_map(|m| match &m.node {
            Node::Property {
                name,
                default: Some(default),
                ..
            } if name == "except" => match &default.node {
                Node::ArrayLiteral { items } => Some(items),
                _ => None,
            },
            _ => None,
        });
        for item in items.into_iter().flatten() {
            let Some(uri) = item.value.as_str() else {
                continue;
            };
            let finding = if uri.contains('*') {
                src.node_finding(
                    &item.value,
                    Severity::High,
                    format!("CSRF verification is disabled for every route matching '{uri}'"),
                    "Exempt individual webhook URIs instead of wildcard patterns.",
                )
            } else {
                src.node_finding(
                    &item.value,
                    Severity::Low,
                    format!("CSRF verification is disabled for '{uri}'"),
                    "Confirm the route is only called by trusted third parties with their own signature check.",
                )
            };
            findings.push(finding.with_metadata("uri", uri));
        }
    }

    fn check_view(
        &self,
        ctx: &ScanContext,
        src: &Source,
        patterns: &FormPatterns,
        findings: &mut Vec<Finding>,
    ) {
        let Some(text) = ctx.read(&src.path) else {
            return;
        };
        let lines = src.lines();
        for tag in patterns.form.find_iter(&text) {
            let tag_text = tag.as_str();
            let Some(method) = patterns.method.captures(tag_text).and_then(|c| c.get(1)) else {
                continue;
            };
            if patterns.external_action.is_match(tag_text) {
                continue;
            }
            let line = line_of_offset(&text, tag.start());
            let start = line - 1;
            let end = balanced_region_end_str(lines, start, "<form", "</form>", self.scan_lines);
            let region = lines
                .get(start..=end.max(start))
                .unwrap_or_default()
                .join("\n")
                .to_ascii_lowercase();
            if self.markers.iter().any(|m| region.contains(m.as_str())) {
                continue;
            }
            let method = method.as_str().to_ascii_uppercase();
            findings.push(
                src.finding(
                    Severity::High,
                    line,
                    format!("{method} form without a CSRF token"),
                    "Add @csrf inside the form.",
                )
                .with_metadata("method", method),
            );
        }
    }
}

struct FormPatterns {
    form: Regex,
    method: Regex,
    external_action: Regex,
}

impl FormPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(FormPatterns {
            // quoted attribute values may contain `>`, as in Blade's `=>`
            form: Regex::new(r#"(?is)<form\b(?:"[^"]*"|'[^']*'|[^'">])*>"#)?,
            method: Regex::new(r#"(?i)\bmethod\s*=\s*["']?\s*(post|put|patch|delete)\b"#)?,
            external_action: Regex::new(r#"(?i)\baction\s*=\s*["']\s*(https?:)?//"#)?,
        })
    }
}

impl Rule for CsrfProtection {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        !ctx.files().middleware.is_empty() || !ctx.files().views.is_empty()
    }

    fn skip_reason(&self) -> String {
        "no middleware or Blade views found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let files = ctx.files();
        let mut findings = Vec::new();
        let middleware = files.middleware.iter().map(|p| p.as_path());
        for (src, ast) in php_trees(ctx, middleware) {
            for class in ir::find_classes(&ast.nodes) {
                self.check_exemptions(&src, class, &mut findings);
            }
        }
        let patterns = FormPatterns::new()?;
        for view in &files.views {
            let src = Source::new(ctx, view);
            self.check_view(ctx, &src, &patterns, &mut findings);
        }
        Ok(aggregate(
            findings,
            "Forms and routes are covered by CSRF verification",
            "{count} CSRF protection gap(s)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_patterns() {
        let p = FormPatterns::new().unwrap();
        let post = r#"<form method="POST" action="/profile">"#;
        assert!(p.form.is_match(post));
        assert_eq!(&p.method.captures(post).unwrap()[1], "POST");
        assert!(p.method.captures(r#"<form method="get">"#).is_none());
        assert!(p.method.captures("<form action=\"/search\">").is_none());
        assert!(p.external_action.is_match(r#"<form method="post" action="https://pay.example.com/checkout">"#));
        assert!(p.external_action.is_match(r#"<form method="post" action="//cdn.example.com">"#));
        assert!(!p.external_action.is_match(r#"<form method="post" action="{{ route('login') }}">"#));
    }

    #[test]
    fn csrf_middleware_names() {
        assert!(CsrfProtection::is_csrf_middleware("VerifyCsrfToken", Some("Middleware")));
        assert!(CsrfProtection::is_csrf_middleware(
            "Custom",
            Some("Illuminate\\Foundation\\Http\\Middleware\\VerifyCsrfToken")
        ));
        assert!(!CsrfProtection::is_csrf_middleware("Authenticate", None));
    }
}
