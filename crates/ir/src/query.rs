//! Queries over parsed trees. All functions walk in pre-order, so results
//! come back in source order.

use crate::ast::{Node, NodeKind, SyntaxNode};

fn walk_all(tree: &[SyntaxNode]) -> impl Iterator<Item = &SyntaxNode> {
    tree.iter().flat_map(|n| n.walk())
}

pub fn find_nodes_of_kind(tree: &[SyntaxNode], kind: NodeKind) -> Vec<&SyntaxNode> {
    walk_all(tree).filter(|n| n.kind() == kind).collect()
}

/// Static calls `Class::method(...)`. The class comparison ignores a leading
/// namespace separator and ASCII case, as PHP does.
pub fn find_static_calls<'a>(
    tree: &'a [SyntaxNode],
    class_name: &str,
    method_name: &str,
) -> Vec<&'a SyntaxNode> {
    walk_all(tree)
        .filter(|n| match &n.node {
            Node::StaticCall { class, name, .. } => {
                class_matches(class, class_name) && name.eq_ignore_ascii_case(method_name)
            }
            _ => false,
        })
        .collect()
}

pub fn find_method_calls_by_name<'a>(
    tree: &'a [SyntaxNode],
    method_name: &str,
) -> Vec<&'a SyntaxNode> {
    walk_all(tree)
        .filter(|n| matches!(&n.node, Node::MethodCall { name, .. } if name.eq_ignore_ascii_case(method_name)))
        .collect()
}

pub fn find_function_calls<'a>(tree: &'a [SyntaxNode], function: &str) -> Vec<&'a SyntaxNode> {
    walk_all(tree)
        .filter(|n| matches!(&n.node, Node::FunctionCall { name, .. } if class_matches(name, function)))
        .collect()
}

pub fn find_classes(tree: &[SyntaxNode]) -> Vec<&SyntaxNode> {
    find_nodes_of_kind(tree, NodeKind::Class)
}

/// Every call node (function, method or static) in the tree.
pub fn find_calls(tree: &[SyntaxNode]) -> Vec<&SyntaxNode> {
    walk_all(tree)
        .filter(|n| {
            matches!(
                n.kind(),
                NodeKind::FunctionCall | NodeKind::MethodCall | NodeKind::StaticCall
            )
        })
        .collect()
}

/// Compares two PHP names, ignoring case and a leading `\`. A fully
/// qualified `actual` also matches its short form.
pub fn class_matches(actual: &str, expected: &str) -> bool {
    let actual = actual.trim_start_matches('\\');
    let expected = expected.trim_start_matches('\\');
    if actual.eq_ignore_ascii_case(expected) {
        return true;
    }
    actual
        .rsplit('\\')
        .next()
        .is_some_and(|short| short.eq_ignore_ascii_case(expected))
}
