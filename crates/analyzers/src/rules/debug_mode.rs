use crate::catalog::{docs_url, DEBUG_FUNCTIONS, DEBUG_PACKAGES, PRODUCTION_ENVIRONMENTS};
use crate::support::{env_call, php_trees, returned_array, Source};
use engine::text::line_of_offset;
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{Node, SyntaxNode};
use loader::RuleOptions;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

/// Debug output left enabled: `APP_DEBUG`, `config/app.php`, stray dump
/// calls and debug packages installed for production.
pub struct DebugMode {
    meta: RuleMetadata,
    functions: Vec<String>,
    packages: Vec<String>,
    production: Vec<String>,
}

/// dotenv truthiness as Laravel's `env()` helper reads it.
pub(crate) fn env_truthy(value: &str) -> bool {
    let v = value.trim().trim_matches(|c| c == '(' || c == ')');
    ["true", "1", "on", "yes"]
        .iter()
        .any(|t| v.eq_ignore_ascii_case(t))
}

impl DebugMode {
    pub const ID: &'static str = "debug-mode";

    pub fn new(options: &RuleOptions) -> Self {
        DebugMode {
            meta: RuleMetadata::new(Self::ID, "Debug mode", Category::Config, Severity::High)
                .with_description("Debug mode, dump helpers or debug packages reachable in production")
                .with_tags(["security", "configuration", "information-disclosure"])
                .with_docs_url(&docs_url(Self::ID))
                .with_fix_minutes(5),
            functions: options.str_list_or("functions", DEBUG_FUNCTIONS),
            packages: options.str_list_or("packages", DEBUG_PACKAGES),
            production: options.str_list_or("production_environments", PRODUCTION_ENVIRONMENTS),
        }
    }

    fn is_production(&self, name: &str) -> bool {
        self.production.iter().any(|p| p.eq_ignore_ascii_case(name.trim()))
    }

    fn check_env(&self, ctx: &ScanContext, path: &Path, findings: &mut Vec<Finding>) {
        let Some(env) = ctx.env(path) else {
            return;
        };
        let Some(entry) = env.get("APP_DEBUG") else {
            return;
        };
        if !env_truthy(&entry.value) {
            return;
        }
        let suffix = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(".env."))
            .unwrap_or_default();
        let app_env = env.get("APP_ENV").map(|e| e.value.as_str()).unwrap_or_default();
        let production = self.is_production(suffix) || self.is_production(app_env);
        let src = Source::new(ctx, path);
        let finding = if production {
            src.finding(
                Severity::Critical,
                entry.line,
                "APP_DEBUG is enabled in a production environment file",
                "Set APP_DEBUG=false for production; debug pages expose stack traces and environment values.",
            )
        } else {
            src.finding(
                Severity::Medium,
                entry.line,
                "APP_DEBUG is enabled",
                "Make sure APP_DEBUG=false wherever this file is deployed.",
            )
        };
        findings.push(finding.with_metadata("production", production));
    }

    fn check_app_config(&self, ctx: &ScanContext, findings: &mut Vec<Finding>) {
        let Some(path) = ctx.files().config_file("app") else {
            return;
        };
        let Some(ast) = ctx.ast(path) else {
            return;
        };
        let Some(value) = returned_array(&ast).and_then(|c| c.array_get("debug")) else {
            return;
        };
        let src = Source::new(ctx, path);
        if value.is_true() {
            findings.push(src.node_finding(
                value,
                Severity::High,
                "config/app.php hard-codes 'debug' => true",
                "Read the flag from the environment: 'debug' => (bool) env('APP_DEBUG', false).",
            ));
        } else if let Some((_, Some(default))) = inner_env(value) {
            if default.is_true() {
                findings.push(src.node_finding(
                    value,
                    Severity::Medium,
                    "config/app.php enables debug mode when APP_DEBUG is unset",
                    "Default the flag to false: env('APP_DEBUG', false).",
                ));
            }
        }
    }

    fn check_calls(&self, src: &Source, nodes: &[SyntaxNode], findings: &mut Vec<Finding>) {
        for node in nodes.iter().flat_map(|n| n.walk()) {
            let Node::FunctionCall { name, args } = &node.node else {
                continue;
            };
            if !self.functions.iter().any(|f| f.eq_ignore_ascii_case(name)) {
                continue;
            }
            let returns_string = (name.eq_ignore_ascii_case("print_r")
                || name.eq_ignore_ascii_case("var_export"))
                && args.get(1).is_some_and(|a| a.is_true());
            if returns_string {
                continue;
            }
            let severity = if name.eq_ignore_ascii_case("phpinfo") {
                Severity::High
            } else {
                Severity::Medium
            };
            findings.push(
                src.node_finding(
                    node,
                    severity,
                    format!("Debug call {name}() left in application code"),
                    "Remove the call or guard it behind a local-only check.",
                )
                .with_metadata("function", name.as_str()),
            );
        }
    }

    fn check_composer(&self, ctx: &ScanContext, path: &Path, findings: &mut Vec<Finding>) {
        let Some(text) = ctx.read(path) else {
            return;
        };
        let manifest: JsonValue = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping invalid composer.json");
                return;
            }
        };
        let Some(require) = manifest.get("require").and_then(JsonValue::as_object) else {
            return;
        };
        let src = Source::new(ctx, path);
        for package in self.packages.iter().filter(|p| require.contains_key(p.as_str())) {
            let quoted = format!("\"{package}\"");
            let line = text.find(&quoted).map_or(1, |off| line_of_offset(&text, off));
            findings.push(
                src.finding(
                    Severity::High,
                    line,
                    format!("Debug package {package} is installed as a production dependency"),
                    "Move the package to require-dev.",
                )
                .with_metadata("package", package.as_str()),
            );
        }
    }
}

/// `env(...)` directly or behind a cast: `(bool) env('APP_DEBUG', true)`.
fn inner_env(node: &SyntaxNode) -> Option<(&str, Option<&SyntaxNode>)> {
    match &node.node {
        Node::Cast { inner, .. } => inner_env(inner),
        _ => env_call(node),
    }
}

impl Rule for DebugMode {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        let files = ctx.files();
        !files.env.is_empty() || files.config_file("app").is_some() || files.composer_json.is_some()
    }

    fn skip_reason(&self) -> String {
        "no .env, config/app.php or composer.json found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let files = ctx.files();
        let mut findings = Vec::new();
        for path in &files.env {
            self.check_env(ctx, path, &mut findings);
        }
        self.check_app_config(ctx, &mut findings);
        let code = files
            .app_files()
            .into_iter()
            .chain(files.routes.iter().map(|p| p.as_path()));
        for (src, ast) in php_trees(ctx, code) {
            self.check_calls(&src, &ast.nodes, &mut findings);
        }
        if let Some(path) = &files.composer_json {
            self.check_composer(ctx, path, &mut findings);
        }
        Ok(aggregate(
            findings,
            "Debug mode is disabled",
            "{count} debug mode issue(s)",
        ))
    }
}
