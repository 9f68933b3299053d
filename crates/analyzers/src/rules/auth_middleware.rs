use crate::catalog::{
    docs_url, AUTH_MIDDLEWARE, GUEST_MIDDLEWARE, PUBLIC_URI_SEGMENTS, READ_ONLY_VERBS,
    ROUTE_FACADES, SENSITIVE_URI_KEYWORDS, STATE_CHANGING_VERBS,
};
use crate::support::{
    body_of, is_function_like, php_trees, referenced_class, short_name, string_values,
    wildcard_match, Source,
};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{Node, SyntaxNode};
use loader::RuleOptions;
use patterns::{chain_calls, NameResolver};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Route counts gathered while walking the route files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub total: usize,
    pub state_changing: usize,
    pub protected: usize,
    pub unprotected_state_changing: usize,
}

/// State-changing routes reachable without authentication middleware.
pub struct AuthMiddleware {
    meta: RuleMetadata,
    route_facades: Vec<String>,
    state_changing: Vec<String>,
    read_only: Vec<String>,
    auth: Vec<String>,
    guest: Vec<String>,
    sensitive: Vec<String>,
    public: Vec<String>,
    warn_unprotected_app: bool,
}

/// Middleware and prefix inherited from the enclosing groups.
#[derive(Debug, Clone, Default)]
struct Scope<'a> {
    protected: bool,
    guest: bool,
    prefix: String,
    controller: Option<&'a str>,
}

struct RouteWalk<'r> {
    rule: &'r AuthMiddleware,
    src: &'r Source,
    names: NameResolver,
    protected_controllers: &'r HashSet<String>,
    stats: &'r mut RouteStats,
    findings: &'r mut Vec<Finding>,
}

fn listed(list: &[String], name: &str) -> bool {
    list.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn join_uri(prefix: &str, uri: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(uri.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Calls of a route definition from the `Route::` root outwards, when
/// `node` is one.
fn route_chain<'a>(node: &'a SyntaxNode, names: &NameResolver) -> Option<Vec<&'a SyntaxNode>> {
    let mut calls = chain_calls(node);
    let root = match calls.last() {
        Some(last) => match &last.node {
            Node::MethodCall { receiver, .. } => receiver.as_ref(),
            _ => return None,
        },
        None => node,
    };
    match &root.node {
        Node::StaticCall { class, .. } if names.is_known(class) => {}
        _ => return None,
    }
    calls.reverse();
    let mut chain = vec![root];
    chain.extend(calls);
    Some(chain)
}

impl AuthMiddleware {
    pub const ID: &'static str = "auth-middleware";

    pub fn new(options: &RuleOptions) -> Self {
        AuthMiddleware {
            meta: RuleMetadata::new(
                Self::ID,
                "Authentication middleware",
                Category::Security,
                Severity::High,
            )
            .with_description("State-changing routes registered outside authentication middleware")
            .with_tags(["security", "routing", "authentication", "owasp-a01"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(15),
            route_facades: options.str_list_or("route_facades", ROUTE_FACADES),
            state_changing: options.str_list_or("state_changing_verbs", STATE_CHANGING_VERBS),
            read_only: options.str_list_or("read_only_verbs", READ_ONLY_VERBS),
            auth: options.str_list_or("auth_middleware", AUTH_MIDDLEWARE),
            guest: options.str_list_or("guest_middleware", GUEST_MIDDLEWARE),
            sensitive: options.str_list_or("sensitive_keywords", SENSITIVE_URI_KEYWORDS),
            public: options.str_list_or("public_segments", PUBLIC_URI_SEGMENTS),
            warn_unprotected_app: options.bool_or("warn_unprotected_app", true),
        }
    }

    fn is_auth(&self, middleware: &str) -> bool {
        self.auth.iter().any(|p| wildcard_match(p, middleware))
    }

    fn is_guest(&self, middleware: &str) -> bool {
        self.guest.iter().any(|p| wildcard_match(p, middleware))
    }

    fn is_public(&self, uri: &str) -> bool {
        uri.split('/').any(|s| listed(&self.public, s))
    }

    fn is_sensitive(&self, uri: &str) -> bool {
        let uri = uri.to_ascii_lowercase();
        self.sensitive
            .iter()
            .any(|k| uri.contains(k.to_ascii_lowercase().as_str()))
    }

    /// Short names of controllers applying auth middleware themselves,
    /// in `__construct` or a static `middleware()` method.
    fn protected_controllers(&self, ctx: &ScanContext) -> HashSet<String> {
        let controllers = ctx.files().controllers.iter().map(|p| p.as_path());
        let mut out = HashSet::new();
        for (_, ast) in php_trees(ctx, controllers) {
            for class in ir::find_classes(&ast.nodes) {
                let Node::Class { name, members, .. } = &class.node else {
                    continue;
                };
                let protected = members.iter().any(|m| match &m.node {
                    Node::Method { name, body, .. } if name == "__construct" => {
                        body.iter().flat_map(|n| n.walk()).any(|n| match &n.node {
                            Node::MethodCall { name, args, .. } if name == "middleware" => args
                                .iter()
                                .flat_map(|a| string_values(a))
                                .any(|mw| self.is_auth(mw)),
                            _ => false,
                        })
                    }
                    Node::Method { name, body, .. } if name == "middleware" => body
                        .iter()
                        .flat_map(|n| n.walk())
                        .filter_map(|n| n.as_str())
                        .any(|mw| self.is_auth(mw)),
                    _ => false,
                });
                if protected {
                    out.insert(short_name(name).to_ascii_lowercase());
                }
            }
        }
        out
    }
}

impl RouteWalk<'_> {
    fn visit<'a>(&mut self, node: &'a SyntaxNode, scope: &Scope<'a>) {
        if let Some(chain) = route_chain(node, &self.names) {
            self.visit_chain(&chain, scope);
            return;
        }
        for child in node.children() {
            self.visit(child, scope);
        }
    }

    fn visit_chain<'a>(&mut self, chain: &[&'a SyntaxNode], scope: &Scope<'a>) {
        let rule = self.rule;
        let mut middleware: Vec<&str> = Vec::new();
        let mut prefix = None;
        let mut controller = None;
        let mut group = None;
        let mut verb = None;
        for &call in chain {
            let name = call.call_name().unwrap_or_default();
            let args = call.call_args();
            match name.to_ascii_lowercase().as_str() {
                "middleware" => middleware.extend(args.iter().flat_map(|a| string_values(a))),
                "prefix" => prefix = args.first().and_then(|a| a.as_str()),
                "controller" => controller = args.first().and_then(referenced_class),
                "group" => {
                    // Route::group(['middleware' => 'auth', 'prefix' => 'admin'], fn)
                    if let Some(attrs) = args.first() {
                        if let Some(m) = attrs.array_get("middleware") {
                            middleware.extend(string_values(m));
                        }
                        if let Some(p) = attrs.array_get("prefix").and_then(|p| p.as_str()) {
                            prefix = Some(p);
                        }
                    }
                    group = args.iter().rev().find(|a| is_function_like(a));
                }
                _ if verb.is_none()
                    && (listed(&rule.state_changing, name) || listed(&rule.read_only, name)) =>
                {
                    verb = Some(call);
                }
                _ => {}
            }
        }

        let inner = Scope {
            protected: scope.protected || middleware.iter().any(|m| rule.is_auth(m)),
            guest: scope.guest || middleware.iter().any(|m| rule.is_guest(m)),
            prefix: join_uri(&scope.prefix, prefix.unwrap_or_default()),
            controller: controller.or(scope.controller),
        };
        if let Some(group) = group {
            for stmt in body_of(group) {
                self.visit(stmt, &inner);
            }
        } else if let Some(verb) = verb {
            self.route(verb, &inner);
        }
    }

    fn route(&mut self, call: &SyntaxNode, scope: &Scope) {
        let rule = self.rule;
        let verb = call.call_name().unwrap_or_default();
        let args = call.call_args();
        let uri_idx = usize::from(verb.eq_ignore_ascii_case("match"));
        let uri = join_uri(
            &scope.prefix,
            args.get(uri_idx).and_then(|a| a.as_str()).unwrap_or_default(),
        );
        let controller = args
            .get(uri_idx + 1)
            .and_then(|a| match &a.node {
                // 'store' inside Route::controller(..)->group(..)
                Node::StringLiteral { value } if !value.contains('@') => scope.controller,
                _ => referenced_class(a),
            })
            .map(|c| short_name(c).to_ascii_lowercase());
        let protected = scope.protected
            || controller.is_some_and(|c| self.protected_controllers.contains(&c));

        self.stats.total += 1;
        if protected {
            self.stats.protected += 1;
        }
        if !listed(&rule.state_changing, verb) {
            return;
        }
        self.stats.state_changing += 1;
        if protected || scope.guest || rule.is_public(&uri) {
            return;
        }
        self.stats.unprotected_state_changing += 1;
        let severity = if rule.is_sensitive(&uri) {
            Severity::High
        } else {
            Severity::Medium
        };
        let method = verb.to_ascii_uppercase();
        self.findings.push(
            self.src
                .node_finding(
                    call,
                    severity,
                    format!("{method} {uri} is not behind authentication middleware"),
                    "Wrap the route in an auth middleware group or add ->middleware('auth').",
                )
                .with_metadata("method", method)
                .with_metadata("uri", uri),
        );
    }
}

impl Rule for AuthMiddleware {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        !ctx.files().routes.is_empty()
    }

    fn skip_reason(&self) -> String {
        "no route files found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let protected_controllers = self.protected_controllers(ctx);
        let mut stats = RouteStats::default();
        let mut findings = Vec::new();
        let routes = ctx.files().routes.iter().map(|p| p.as_path());
        let trees = php_trees(ctx, routes);
        for (src, ast) in &trees {
            let mut walk = RouteWalk {
                rule: self,
                src,
                names: NameResolver::for_file(&self.route_facades, ast),
                protected_controllers: &protected_controllers,
                stats: &mut stats,
                findings: &mut findings,
            };
            let scope = Scope::default();
            for node in &ast.nodes {
                walk.visit(node, &scope);
            }
        }
        debug!(
            total = stats.total,
            state_changing = stats.state_changing,
            protected = stats.protected,
            unprotected = stats.unprotected_state_changing,
            "Routes analyzed"
        );

        if self.warn_unprotected_app && stats.total > 0 && stats.protected == 0 {
            if let Some((src, _)) = trees.first() {
                findings.push(
                    src.finding(
                        Severity::Low,
                        1,
                        format!("None of the {} routes is protected by authentication middleware", stats.total),
                        "Group authenticated routes under Route::middleware('auth').",
                    )
                    .with_metadata("routes", stats.total),
                );
            }
        }
        Ok(aggregate(
            findings,
            "State-changing routes are behind authentication",
            "{count} route(s) missing authentication middleware",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::builder::*;

    #[test]
    fn uri_joining() {
        assert_eq!(join_uri("", "users"), "/users");
        assert_eq!(join_uri("/admin/", "/users/{id}"), "/admin/users/{id}");
        assert_eq!(join_uri("", "/"), "/");
    }

    #[test]
    fn chains_start_at_route_facade() {
        let names = NameResolver::new(["Route"]);
        let node = method(
            static_call("Route", "post", vec![string("/x")]),
            "middleware",
            vec![string("auth")],
        );
        let chain = route_chain(&node, &names).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].call_name(), Some("post"));
        assert!(route_chain(&method(var("router"), "post", vec![]), &names).is_none());
    }

    #[test]
    fn uri_classification() {
        let rule = AuthMiddleware::new(&RuleOptions::new());
        assert!(rule.is_public("/login"));
        assert!(rule.is_public("/stripe/webhook"));
        assert!(!rule.is_public("/admin/users"));
        assert!(rule.is_sensitive("/Admin/posts"));
        assert!(!rule.is_sensitive("/posts"));
        assert!(rule.is_auth("auth:sanctum"));
        assert!(rule.is_guest("guest"));
    }
}
