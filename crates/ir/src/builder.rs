//! Shorthand constructors for hand-built trees. Every node gets line 1
//! unless it is re-spanned with [`at_line`].

use crate::ast::{ArrayItem, Node, Span, SyntaxNode};

fn mk(node: Node) -> SyntaxNode {
    SyntaxNode::new(Span::at(1), node)
}

/// Returns `node` with its span moved to `line`.
pub fn at_line(mut node: SyntaxNode, line: usize) -> SyntaxNode {
    node.span = Span::at(line);
    node
}

pub fn var(name: &str) -> SyntaxNode {
    mk(Node::Variable { name: name.into() })
}

pub fn string(value: &str) -> SyntaxNode {
    mk(Node::StringLiteral {
        value: value.into(),
    })
}

pub fn int(value: i64) -> SyntaxNode {
    mk(Node::IntLiteral { value })
}

pub fn constant(name: &str) -> SyntaxNode {
    mk(Node::ConstantRef { name: name.into() })
}

pub fn concat(left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
    mk(Node::Concat {
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn interpolated(parts: Vec<SyntaxNode>) -> SyntaxNode {
    mk(Node::InterpolatedString { parts })
}

pub fn call(name: &str, args: Vec<SyntaxNode>) -> SyntaxNode {
    mk(Node::FunctionCall {
        name: name.into(),
        args,
    })
}

pub fn method(receiver: SyntaxNode, name: &str, args: Vec<SyntaxNode>) -> SyntaxNode {
    mk(Node::MethodCall {
        receiver: Box::new(receiver),
        name: name.into(),
        args,
    })
}

pub fn static_call(class: &str, name: &str, args: Vec<SyntaxNode>) -> SyntaxNode {
    mk(Node::StaticCall {
        class: class.into(),
        name: name.into(),
        args,
    })
}

pub fn prop(base: SyntaxNode, name: &str) -> SyntaxNode {
    mk(Node::PropertyAccess {
        base: Box::new(base),
        name: name.into(),
    })
}

pub fn index(base: SyntaxNode, key: SyntaxNode) -> SyntaxNode {
    mk(Node::ArrayAccess {
        base: Box::new(base),
        key: Some(Box::new(key)),
    })
}

pub fn list(values: Vec<SyntaxNode>) -> SyntaxNode {
    mk(Node::ArrayLiteral {
        items: values
            .into_iter()
            .map(|value| ArrayItem { key: None, value })
            .collect(),
    })
}

pub fn map(entries: Vec<(&str, SyntaxNode)>) -> SyntaxNode {
    mk(Node::ArrayLiteral {
        items: entries
            .into_iter()
            .map(|(k, value)| ArrayItem {
                key: Some(string(k)),
                value,
            })
            .collect(),
    })
}

pub fn assign(target: SyntaxNode, value: SyntaxNode) -> SyntaxNode {
    mk(Node::Assignment {
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn ternary(condition: SyntaxNode, then: SyntaxNode, otherwise: SyntaxNode) -> SyntaxNode {
    mk(Node::Ternary {
        condition: Box::new(condition),
        then: Some(Box::new(then)),
        otherwise: Box::new(otherwise),
    })
}

pub fn binary(op: &str, left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
    mk(Node::BinaryOp {
        op: op.into(),
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn cast(ty: &str, inner: SyntaxNode) -> SyntaxNode {
    mk(Node::Cast {
        ty: ty.into(),
        inner: Box::new(inner),
    })
}

pub fn class(name: &str, extends: Option<&str>, members: Vec<SyntaxNode>) -> SyntaxNode {
    mk(Node::Class {
        name: name.into(),
        extends: extends.map(Into::into),
        implements: Vec::new(),
        members,
    })
}

pub fn property(name: &str, default: Option<SyntaxNode>) -> SyntaxNode {
    mk(Node::Property {
        name: name.into(),
        is_static: false,
        default: default.map(Box::new),
    })
}
