//! Helpers shared by the rules.

use engine::text::{read_lines, snippet_from_lines};
use engine::{Finding, ScanContext, Severity};
use ir::{FileAst, Node, SyntaxNode};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file under analysis. Lines are read on first use, so files without
/// findings are never read twice.
pub(crate) struct Source {
    pub path: PathBuf,
    pub rel: PathBuf,
    lines: OnceCell<Vec<String>>,
}

impl Source {
    pub fn new(ctx: &ScanContext, path: &Path) -> Self {
        Source {
            path: path.to_path_buf(),
            rel: ctx.relative(path).to_path_buf(),
            lines: OnceCell::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        self.lines.get_or_init(|| read_lines(&self.path))
    }

    pub fn finding(
        &self,
        severity: Severity,
        line: usize,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Finding {
        Finding::new(severity, message, self.rel.clone(), line, recommendation)
            .with_snippet(snippet_from_lines(self.lines(), line, 0).trim())
    }

    pub fn node_finding(
        &self,
        node: &SyntaxNode,
        severity: Severity,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Finding {
        self.finding(severity, node.span.line, message, recommendation)
            .with_column(node.span.column)
    }
}

/// Parsed PHP files among `paths`; unparsable files are skipped.
pub(crate) fn php_trees<'a, I>(ctx: &ScanContext, paths: I) -> Vec<(Source, Arc<FileAst>)>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .filter_map(|p| ctx.ast(p).map(|ast| (Source::new(ctx, p), ast)))
        .collect()
}

pub(crate) fn is_function_like(node: &SyntaxNode) -> bool {
    matches!(
        node.node,
        Node::Function { .. } | Node::Method { .. } | Node::Closure { .. }
    )
}

/// Body statements of a function, method or closure.
pub(crate) fn body_of(node: &SyntaxNode) -> &[SyntaxNode] {
    match &node.node {
        Node::Function { body, .. } | Node::Method { body, .. } | Node::Closure { body, .. } => {
            body
        }
        _ => &[],
    }
}

/// Splits `nodes` into the nodes of their own scope (pre-order) and the
/// function-like nodes nested directly in it.
pub(crate) fn scope_walk(nodes: &[SyntaxNode]) -> (Vec<&SyntaxNode>, Vec<&SyntaxNode>) {
    let mut own = Vec::new();
    let mut nested = Vec::new();
    let mut stack: Vec<&SyntaxNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if is_function_like(node) {
            nested.push(node);
            continue;
        }
        own.push(node);
        stack.extend(node.children().into_iter().rev());
    }
    (own, nested)
}

/// String values of a literal or of an array of literals.
pub(crate) fn string_values(node: &SyntaxNode) -> Vec<&str> {
    match &node.node {
        Node::StringLiteral { value } => vec![value.as_str()],
        Node::ArrayLiteral { items } => items.iter().filter_map(|i| i.value.as_str()).collect(),
        _ => Vec::new(),
    }
}

/// `true` when `value` matches `pattern`, where a trailing `*` in the
/// pattern matches any suffix. Comparison ignores ASCII case.
pub(crate) fn wildcard_match(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value
            .get(..prefix.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(prefix)),
        None => pattern.eq_ignore_ascii_case(value),
    }
}

/// For `env('KEY', default)` returns the key and the default argument.
pub(crate) fn env_call(node: &SyntaxNode) -> Option<(&str, Option<&SyntaxNode>)> {
    match &node.node {
        Node::FunctionCall { name, args } if name.eq_ignore_ascii_case("env") => {
            let key = args.first()?.as_str()?;
            Some((key, args.get(1)))
        }
        _ => None,
    }
}

/// Array returned by a Laravel config file (`return [...]`).
pub(crate) fn returned_array(ast: &FileAst) -> Option<&SyntaxNode> {
    ast.walk().find_map(|n| match &n.node {
        Node::Return { value: Some(v) } if matches!(v.node, Node::ArrayLiteral { .. }) => {
            Some(v.as_ref())
        }
        _ => None,
    })
}

/// Looks up a dotted key (`bcrypt.rounds`) in nested array literals.
pub(crate) fn array_path<'a>(node: &'a SyntaxNode, path: &str) -> Option<&'a SyntaxNode> {
    path.split('.')
        .try_fold(node, |current, key| current.array_get(key))
}

/// Name of the class referenced by `Foo::class` or a `'Foo@bar'` action.
pub(crate) fn referenced_class(node: &SyntaxNode) -> Option<&str> {
    match &node.node {
        Node::ConstantRef { name } => name.strip_suffix("::class"),
        Node::StringLiteral { value } => value.split_once('@').map(|(class, _)| class),
        Node::ArrayLiteral { items } => items.first().and_then(|i| referenced_class(&i.value)),
        _ => None,
    }
}

/// Last segment of a namespaced name.
pub(crate) fn short_name(name: &str) -> &str {
    let name = name.trim_start_matches('\\');
    name.rsplit('\\').next().unwrap_or(name)
}
