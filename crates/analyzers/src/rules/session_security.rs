use crate::catalog::docs_url;
use crate::support::{env_call, returned_array, Source};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{Node, SyntaxNode};
use loader::RuleOptions;
use parsers::EnvFile;
use std::path::Path;

const ENV_PRECEDENCE: &[&str] = &[".env.production", ".env"];

/// Session cookie settings in `config/session.php`, resolved through the
/// project's dotenv files.
pub struct SessionSecurity {
    meta: RuleMetadata,
    env_files: Vec<String>,
}

/// Effective value of one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Setting {
    Bool(bool),
    Null,
    Str(String),
    Unknown,
}

impl Setting {
    fn from_node(node: &SyntaxNode) -> Self {
        match &node.node {
            Node::ConstantRef { name } if name.eq_ignore_ascii_case("null") => Setting::Null,
            Node::ConstantRef { .. } if node.is_true() => Setting::Bool(true),
            Node::ConstantRef { .. } if node.is_false() => Setting::Bool(false),
            Node::StringLiteral { value } => Setting::Str(value.clone()),
            Node::Cast { inner, .. } => Setting::from_node(inner),
            _ => Setting::Unknown,
        }
    }

    fn from_env(raw: &str) -> Self {
        let v = raw.trim().trim_matches(|c| c == '(' || c == ')');
        match v.to_ascii_lowercase().as_str() {
            "true" => Setting::Bool(true),
            "false" => Setting::Bool(false),
            "null" | "" => Setting::Null,
            _ => Setting::Str(raw.trim().to_string()),
        }
    }
}

fn file_label(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Resolved value and where it came from.
struct Resolved<'a> {
    node: &'a SyntaxNode,
    value: Setting,
    source: String,
}

impl SessionSecurity {
    pub const ID: &'static str = "session-security";

    pub fn new(options: &RuleOptions) -> Self {
        SessionSecurity {
            meta: RuleMetadata::new(
                Self::ID,
                "Session security",
                Category::Config,
                Severity::Medium,
            )
            .with_description("Session cookies without Secure, HttpOnly or SameSite protection")
            .with_tags(["security", "session", "cookies", "configuration"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(5),
            env_files: options.str_list_or("env_files", ENV_PRECEDENCE),
        }
    }

    /// First env file, in precedence order, that was discovered.
    fn env(&self, ctx: &ScanContext) -> Option<EnvFile> {
        self.env_files.iter().find_map(|name| {
            ctx.files()
                .env
                .iter()
                .find(|p| p.file_name().is_some_and(|n| n == name.as_str()))
                .and_then(|p| ctx.env(p))
        })
    }

    fn resolve<'a>(
        config: &'a SyntaxNode,
        key: &str,
        env: Option<&EnvFile>,
    ) -> Option<Resolved<'a>> {
        let node = config.array_get(key)?;
        let call = match &node.node {
            Node::Cast { inner, .. } => inner.as_ref(),
            _ => node,
        };
        let resolved = match env_call(call) {
            Some((var, default)) => match env.and_then(|e| e.get(var).map(|entry| (e, entry))) {
                Some((file, entry)) => Resolved {
                    node,
                    value: Setting::from_env(&entry.value),
                    source: format!("{} ({var})", file_label(&file.path)),
                },
                None => Resolved {
                    node,
                    value: default.map_or(Setting::Null, Setting::from_node),
                    source: format!("default of env('{var}')"),
                },
            },
            None => Resolved {
                node,
                value: Setting::from_node(node),
                source: "config/session.php".into(),
            },
        };
        Some(resolved)
    }

    fn check(
        src: &Source,
        setting: Option<Resolved>,
        findings: &mut Vec<Finding>,
        issue: impl Fn(&Setting) -> Option<(Severity, &'static str, &'static str)>,
    ) {
        let Some(setting) = setting else {
            return;
        };
        if let Some((severity, message, rec)) = issue(&setting.value) {
            findings.push(
                src.node_finding(
                    setting.node,
                    severity,
                    format!("{message} (from {})", setting.source),
                    rec,
                )
                .with_metadata("source", setting.source),
            );
        }
    }
}

impl Rule for SessionSecurity {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        ctx.files().config_file("session").is_some()
    }

    fn skip_reason(&self) -> String {
        "config/session.php not found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let mut findings = Vec::new();
        let Some(path) = ctx.files().config_file("session") else {
            return Ok(Outcome::skipped(self.skip_reason()));
        };
        let Some(ast) = ctx.ast(path) else {
            return Ok(Outcome::errored("config/session.php could not be parsed"));
        };
        let Some(config) = returned_array(&ast) else {
            return Ok(Outcome::passed("config/session.php returns no array"));
        };
        let env = self.env(ctx);
        let env = env.as_ref();
        let src = Source::new(ctx, path);

        Self::check(&src, Self::resolve(config, "secure", env), &mut findings, |v| {
            (*v == Setting::Bool(false)).then_some((
                Severity::Medium,
                "Session cookie is sent over plain HTTP (secure => false)",
                "Set SESSION_SECURE_COOKIE=true in production.",
            ))
        });
        Self::check(&src, Self::resolve(config, "http_only", env), &mut findings, |v| {
            (*v == Setting::Bool(false)).then_some((
                Severity::High,
                "Session cookie is readable from JavaScript (http_only => false)",
                "Keep 'http_only' => true.",
            ))
        });
        Self::check(&src, Self::resolve(config, "same_site", env), &mut findings, |v| {
            let weak = match v {
                Setting::Null => true,
                Setting::Str(s) => s.eq_ignore_ascii_case("none"),
                _ => false,
            };
            weak.then_some((
                Severity::Low,
                "Session cookie has no SameSite protection",
                "Set 'same_site' => 'lax' or 'strict'.",
            ))
        });
        Self::check(&src, Self::resolve(config, "encrypt", env), &mut findings, |v| {
            (*v == Setting::Bool(false)).then_some((
                Severity::Info,
                "Session payloads are stored unencrypted (encrypt => false)",
                "Enable 'encrypt' when sessions hold sensitive data.",
            ))
        });

        Ok(aggregate(
            findings,
            "Session cookies are hardened",
            "{count} session setting issue(s)",
        ))
    }
}
