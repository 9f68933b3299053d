use crate::catalog::{docs_url, CSP_PACKAGES, HEADER_PACKAGES, SECURITY_HEADERS};
use crate::support::{php_trees, returned_array, string_values, Source};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::Node;
use loader::RuleOptions;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const CSP: &str = "Content-Security-Policy";

/// Security response headers no middleware sets, and credentialed CORS
/// open to every origin.
pub struct SecurityHeaders {
    meta: RuleMetadata,
    header_packages: Vec<String>,
    csp_packages: Vec<String>,
    ignored: Vec<String>,
}

impl SecurityHeaders {
    pub const ID: &'static str = "security-headers";

    pub fn new(options: &RuleOptions) -> Self {
        SecurityHeaders {
            meta: RuleMetadata::new(
                Self::ID,
                "Security headers",
                Category::Security,
                Severity::Medium,
            )
            .with_description("Missing security response headers and permissive CORS")
            .with_tags(["security", "headers", "cors", "owasp-a05"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(30),
            header_packages: options.str_list_or("header_packages", HEADER_PACKAGES),
            csp_packages: options.str_list_or("csp_packages", CSP_PACKAGES),
            ignored: options.str_list_or("ignore_headers", &[]),
        }
    }

    /// Lowercased header names that appear as string literals in PHP code.
    fn headers_in_code(&self, ctx: &ScanContext) -> HashSet<String> {
        let mut seen = HashSet::new();
        for (_, ast) in php_trees(ctx, ctx.files().php_files()) {
            for node in ast.walk() {
                if let Node::StringLiteral { value } = &node.node {
                    for (name, _) in SECURITY_HEADERS {
                        if value.to_ascii_lowercase().contains(&name.to_ascii_lowercase()) {
                            seen.insert(name.to_ascii_lowercase());
                        }
                    }
                }
            }
        }
        seen
    }

    fn installed_packages(&self, ctx: &ScanContext) -> HashSet<String> {
        let Some(text) = ctx.files().composer_json.as_deref().and_then(|p| ctx.read(p)) else {
            return HashSet::new();
        };
        let Ok(manifest) = serde_json::from_str::<JsonValue>(&text) else {
            return HashSet::new();
        };
        ["require", "require-dev"]
            .iter()
            .filter_map(|k| manifest.get(k).and_then(JsonValue::as_object))
            .flat_map(|deps| deps.keys().map(|k| k.to_ascii_lowercase()))
            .collect()
    }

    /// Where a header middleware would be registered.
    fn anchor(ctx: &ScanContext) -> PathBuf {
        let root = ctx.root();
        ["app/Http/Kernel.php", "bootstrap/app.php"]
            .iter()
            .find(|rel| root.join(rel).is_file())
            .map_or_else(|| PathBuf::from("app/Http/Middleware"), |rel| PathBuf::from(*rel))
    }

    fn check_cors(&self, ctx: &ScanContext, path: &Path, findings: &mut Vec<Finding>) {
        let Some(ast) = ctx.ast(path) else {
            return;
        };
        let Some(config) = returned_array(&ast) else {
            return;
        };
        let wildcard = config
            .array_get("allowed_origins")
            .is_some_and(|o| string_values(o).contains(&"*"));
        let Some(credentials) = config.array_get("supports_credentials") else {
            return;
        };
        if wildcard && credentials.is_true() {
            findings.push(Source::new(ctx, path).node_finding(
                credentials,
                Severity::High,
                "CORS allows credentialed requests from any origin",
                "List the trusted origins in allowed_origins or disable supports_credentials.",
            ));
        }
    }
}

impl Rule for SecurityHeaders {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        ctx.files().has_php()
    }

    fn skip_reason(&self) -> String {
        "no PHP files found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let mut findings = Vec::new();
        let in_code = self.headers_in_code(ctx);
        let packages = self.installed_packages(ctx);
        let has = |list: &[String]| list.iter().any(|p| packages.contains(&p.to_ascii_lowercase()));
        let all_covered = has(&self.header_packages);
        let csp_covered = all_covered || has(&self.csp_packages);
        let anchor = Self::anchor(ctx);

        for (name, severity) in SECURITY_HEADERS {
            let covered = all_covered
                || (*name == CSP && csp_covered)
                || in_code.contains(&name.to_ascii_lowercase())
                || self.ignored.iter().any(|i| i.eq_ignore_ascii_case(name));
            if covered {
                continue;
            }
            findings.push(
                Finding::new(
                    *severity,
                    format!("No middleware sets the {name} header"),
                    anchor.clone(),
                    1,
                    format!("Add a middleware that sets {name} on every response."),
                )
                .with_metadata("header", *name),
            );
        }
        if let Some(cors) = ctx.files().config_file("cors") {
            self.check_cors(ctx, cors, &mut findings);
        }
        Ok(aggregate(
            findings,
            "Security headers are configured",
            "{count} security header issue(s)",
        ))
    }
}
