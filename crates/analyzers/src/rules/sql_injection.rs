use crate::catalog::{
    docs_url, DB_FACADES, NON_MODEL_CLASSES, PDO_METHODS, PDO_VARIABLES, QUERY_VARIABLES,
    RAW_BUILDER_METHODS, RAW_DB_METHODS, RAW_SQL_FUNCTIONS,
};
use crate::support::{body_of, php_trees, scope_walk, Source};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{class_matches, Node, NodeKind, SyntaxNode};
use loader::RuleOptions;
use patterns::{is_fluent_chain_rooted_at, InputSources, Matcher, NameResolver};
use std::collections::HashMap;

const BUILDER_CHAIN: &[&str] = &[
    "select", "addSelect", "from", "join", "leftJoin", "rightJoin", "crossJoin", "orderBy",
    "orderByDesc", "latest", "oldest", "groupBy", "having", "limit", "take", "offset", "skip",
    "distinct", "with", "withTrashed", "onlyTrashed", "newQuery", "query", "toBase", "getQuery",
    "lockForUpdate", "sharedLock", "when", "unless", "forPage", "inRandomOrder", "reorder",
];

/// Raw SQL sinks fed with strings built by concatenation or interpolation.
pub struct SqlInjection {
    meta: RuleMetadata,
    db_facades: Vec<String>,
    raw_db_methods: Vec<String>,
    raw_builder_methods: Vec<String>,
    raw_functions: Vec<String>,
    pdo_methods: Vec<String>,
    pdo_variables: Vec<String>,
    query_variables: Vec<String>,
}

impl SqlInjection {
    pub const ID: &'static str = "sql-injection";

    pub fn new(options: &RuleOptions) -> Self {
        SqlInjection {
            meta: RuleMetadata::new(Self::ID, "SQL injection", Category::Security, Severity::High)
                .with_description(
                    "Raw query APIs receiving SQL assembled with concatenation or string interpolation",
                )
                .with_tags(["security", "sql", "injection", "owasp-a03"])
                .with_docs_url(&docs_url(Self::ID))
                .with_fix_minutes(20),
            db_facades: options.str_list_or("db_facades", DB_FACADES),
            raw_db_methods: options.str_list_or("raw_db_methods", RAW_DB_METHODS),
            raw_builder_methods: options.str_list_or("raw_builder_methods", RAW_BUILDER_METHODS),
            raw_functions: options.str_list_or("raw_functions", RAW_SQL_FUNCTIONS),
            pdo_methods: options.str_list_or("pdo_methods", PDO_METHODS),
            pdo_variables: options.str_list_or("pdo_variables", PDO_VARIABLES),
            query_variables: options.str_list_or("query_variables", QUERY_VARIABLES),
        }
    }

    fn listed(list: &[String], name: &str) -> bool {
        list.iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    fn is_builder_method(&self, name: &str) -> bool {
        Self::listed(&self.raw_builder_methods, name)
            || BUILDER_CHAIN.iter().any(|m| m.eq_ignore_ascii_case(name))
            || name.starts_with("where")
            || name.starts_with("orWhere")
    }

    /// Roots a builder chain may start from: `DB::table`, model static
    /// calls and `$query`-like variables.
    fn is_query_root(&self, node: &SyntaxNode, names: &NameResolver) -> bool {
        match &node.node {
            Node::StaticCall { class, name, .. } => {
                if names.is_known(class) {
                    ["table", "connection", "query"]
                        .iter()
                        .any(|m| m.eq_ignore_ascii_case(name))
                } else {
                    !NON_MODEL_CLASSES.iter().any(|c| class_matches(class, c))
                }
            }
            Node::Variable { name } => Self::listed(&self.query_variables, name),
            _ => false,
        }
    }

    fn is_pdo(&self, node: &SyntaxNode) -> bool {
        match &node.node {
            Node::Variable { name } | Node::PropertyAccess { name, .. } => {
                Self::listed(&self.pdo_variables, name)
            }
            Node::MethodCall { name, .. } => name.eq_ignore_ascii_case("getPdo"),
            _ => false,
        }
    }

    /// Sink label and SQL argument when `node` is a raw query call.
    fn sink<'a>(&self, node: &'a SyntaxNode, names: &NameResolver) -> Option<(String, &'a SyntaxNode)> {
        match &node.node {
            Node::StaticCall { class, name, args } => {
                let raw = if names.is_known(class) {
                    Self::listed(&self.raw_db_methods, name)
                } else {
                    Self::listed(&self.raw_builder_methods, name)
                        && !NON_MODEL_CLASSES.iter().any(|c| class_matches(class, c))
                };
                raw.then(|| (format!("{class}::{name}()"), args.first()))
                    .and_then(|(label, arg)| arg.map(|a| (label, a)))
            }
            Node::MethodCall {
                receiver,
                name,
                args,
            } => {
                let builder = Self::listed(&self.raw_builder_methods, name)
                    && is_fluent_chain_rooted_at(
                        receiver,
                        |m| self.is_builder_method(m),
                        |root| self.is_query_root(root, names),
                    );
                let connection = Self::listed(&self.raw_db_methods, name)
                    && matches!(&receiver.node, Node::StaticCall { class, name: c, .. }
                        if names.is_known(class) && c.eq_ignore_ascii_case("connection"));
                let pdo = Self::listed(&self.pdo_methods, name) && self.is_pdo(receiver);
                if builder || connection || pdo {
                    args.first().map(|a| (format!("->{name}()"), a))
                } else {
                    None
                }
            }
            Node::FunctionCall { name, args } if Self::listed(&self.raw_functions, name) => {
                let idx = if name.to_ascii_lowercase().starts_with("mysqli_") {
                    1
                } else if name.eq_ignore_ascii_case("pg_query") && args.len() >= 2 {
                    1
                } else {
                    0
                };
                args.get(idx).map(|a| (format!("{name}()"), a))
            }
            _ => None,
        }
    }

    fn scan_scope(
        &self,
        body: &[SyntaxNode],
        src: &Source,
        names: &NameResolver,
        findings: &mut Vec<Finding>,
    ) {
        let (own, nested) = scope_walk(body);
        let mut assigned: HashMap<&str, Vec<&SyntaxNode>> = HashMap::new();
        for &node in &own {
            if let Node::Assignment { target, value } = &node.node {
                if let Node::Variable { name } = &target.node {
                    assigned.entry(name.as_str()).or_default().push(value);
                }
            }
        }

        let mut matcher = Matcher::new(InputSources::shared());
        for &node in &own {
            let Some((sink, sql)) = self.sink(node, names) else {
                continue;
            };
            // `$sql` built earlier in the same function
            let candidates: Vec<&SyntaxNode> = match &sql.node {
                Node::Variable { name } => {
                    let mut c = vec![sql];
                    c.extend(assigned.get(name.as_str()).into_iter().flatten().copied());
                    c
                }
                _ => vec![sql],
            };
            let Some(dynamic) = candidates
                .iter()
                .find_map(|&c| matcher.find_first_vulnerable_node(c))
            else {
                continue;
            };
            let tainted = candidates
                .iter()
                .any(|&c| matcher.find_first_tainted_input_node(c).is_some());
            let construction = match dynamic.kind() {
                NodeKind::Concat => "string concatenation",
                _ => "string interpolation",
            };
            let (severity, message) = if tainted {
                (
                    Severity::Critical,
                    format!("{sink} receives SQL built with {construction} from request input"),
                )
            } else {
                (
                    Severity::High,
                    format!("{sink} receives SQL built with {construction}"),
                )
            };
            findings.push(
                src.node_finding(
                    node,
                    severity,
                    message,
                    "Use parameter bindings (`?` placeholders or the query builder) instead of building SQL strings.",
                )
                .with_metadata("sink", sink)
                .with_metadata("construction", construction)
                .with_metadata("tainted", tainted),
            );
        }

        for func in nested {
            self.scan_scope(body_of(func), src, names, findings);
        }
    }
}

impl Rule for SqlInjection {
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
        for (src, ast) in php_trees(ctx, ctx.files().php_files()) {
            let names = NameResolver::for_file(&self.db_facades, &ast);
            self.scan_scope(&ast.nodes, &src, &names, &mut findings);
        }
        Ok(aggregate(
            findings,
            "No raw SQL built from dynamic strings",
            "{count} raw SQL call(s) built from dynamic strings",
        ))
    }
}
