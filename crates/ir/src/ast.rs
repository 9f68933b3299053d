//! Syntax tree representation for PHP sources.
//!
//! Every node carries a [`Span`] locating it in the file and a [`Node`]
//! payload. Trees are immutable once built by the parser: analyzers only
//! borrow them.

use serde::{Deserialize, Serialize};

/// Position of a node in its file. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, end_line: usize) -> Self {
        Self {
            line,
            column,
            end_line: end_line.max(line),
        }
    }

    /// Single-line span, mostly useful when building trees by hand.
    pub fn at(line: usize) -> Self {
        Self::new(line, 1, line)
    }
}

/// Element of an array literal. `key` is present for `'k' => v` items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItem {
    pub key: Option<SyntaxNode>,
    pub value: SyntaxNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// String concatenation with the `.` operator.
    Concat {
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },
    /// Double-quoted string or heredoc with embedded expressions.
    InterpolatedString { parts: Vec<SyntaxNode> },
    FunctionCall {
        name: String,
        args: Vec<SyntaxNode>,
    },
    MethodCall {
        receiver: Box<SyntaxNode>,
        name: String,
        args: Vec<SyntaxNode>,
    },
    StaticCall {
        class: String,
        name: String,
        args: Vec<SyntaxNode>,
    },
    ArrayLiteral { items: Vec<ArrayItem> },
    ArrayAccess {
        base: Box<SyntaxNode>,
        key: Option<Box<SyntaxNode>>,
    },
    Assignment {
        target: Box<SyntaxNode>,
        value: Box<SyntaxNode>,
    },
    Ternary {
        condition: Box<SyntaxNode>,
        /// Absent for the short form `a ?: b`.
        then: Option<Box<SyntaxNode>>,
        otherwise: Box<SyntaxNode>,
    },
    BinaryOp {
        op: String,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },
    Cast {
        ty: String,
        inner: Box<SyntaxNode>,
    },
    Variable { name: String },
    PropertyAccess {
        base: Box<SyntaxNode>,
        name: String,
    },
    StringLiteral { value: String },
    IntLiteral { value: i64 },
    /// Bare constant (`PASSWORD_BCRYPT`, `true`, `null`) or class constant
    /// (`Hash::DEFAULT`).
    ConstantRef { name: String },
    New {
        class: String,
        args: Vec<SyntaxNode>,
    },
    Closure {
        params: Vec<String>,
        body: Vec<SyntaxNode>,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<SyntaxNode>,
    },
    Class {
        name: String,
        extends: Option<String>,
        implements: Vec<String>,
        members: Vec<SyntaxNode>,
    },
    Property {
        name: String,
        is_static: bool,
        default: Option<Box<SyntaxNode>>,
    },
    Method {
        name: String,
        params: Vec<String>,
        body: Vec<SyntaxNode>,
    },
    Return { value: Option<Box<SyntaxNode>> },
    Namespace { name: String },
    Use { path: String, alias: Option<String> },
    /// Any construct without a dedicated variant. Children keep source order
    /// so tree walks still reach nested expressions.
    Other {
        kind: String,
        children: Vec<SyntaxNode>,
    },
}

/// Field-less discriminant of [`Node`], used by kind-based queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Concat,
    InterpolatedString,
    FunctionCall,
    MethodCall,
    StaticCall,
    ArrayLiteral,
    ArrayAccess,
    Assignment,
    Ternary,
    BinaryOp,
    Cast,
    Variable,
    PropertyAccess,
    StringLiteral,
    IntLiteral,
    ConstantRef,
    New,
    Closure,
    Function,
    Class,
    Property,
    Method,
    Return,
    Namespace,
    Use,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub span: Span,
    pub node: Node,
}

impl SyntaxNode {
    pub fn new(span: Span, node: Node) -> Self {
        Self { span, node }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.node {
            Node::Concat { .. } => NodeKind::Concat,
            Node::InterpolatedString { .. } => NodeKind::InterpolatedString,
            Node::FunctionCall { .. } => NodeKind::FunctionCall,
            Node::MethodCall { .. } => NodeKind::MethodCall,
            Node::StaticCall { .. } => NodeKind::StaticCall,
            Node::ArrayLiteral { .. } => NodeKind::ArrayLiteral,
            Node::ArrayAccess { .. } => NodeKind::ArrayAccess,
            Node::Assignment { .. } => NodeKind::Assignment,
            Node::Ternary { .. } => NodeKind::Ternary,
            Node::BinaryOp { .. } => NodeKind::BinaryOp,
            Node::Cast { .. } => NodeKind::Cast,
            Node::Variable { .. } => NodeKind::Variable,
            Node::PropertyAccess { .. } => NodeKind::PropertyAccess,
            Node::StringLiteral { .. } => NodeKind::StringLiteral,
            Node::IntLiteral { .. } => NodeKind::IntLiteral,
            Node::ConstantRef { .. } => NodeKind::ConstantRef,
            Node::New { .. } => NodeKind::New,
            Node::Closure { .. } => NodeKind::Closure,
            Node::Function { .. } => NodeKind::Function,
            Node::Class { .. } => NodeKind::Class,
            Node::Property { .. } => NodeKind::Property,
            Node::Method { .. } => NodeKind::Method,
            Node::Return { .. } => NodeKind::Return,
            Node::Namespace { .. } => NodeKind::Namespace,
            Node::Use { .. } => NodeKind::Use,
            Node::Other { .. } => NodeKind::Other,
        }
    }

    /// Direct children in source order (left to right).
    pub fn children(&self) -> Vec<&SyntaxNode> {
        let mut out: Vec<&SyntaxNode> = Vec::new();
        match &self.node {
            Node::Concat { left, right } | Node::BinaryOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Node::InterpolatedString { parts } => out.extend(parts.iter()),
            Node::FunctionCall { args, .. }
            | Node::StaticCall { args, .. }
            | Node::New { args, .. } => out.extend(args.iter()),
            Node::MethodCall { receiver, args, .. } => {
                out.push(receiver);
                out.extend(args.iter());
            }
            Node::ArrayLiteral { items } => {
                for item in items {
                    if let Some(k) = &item.key {
                        out.push(k);
                    }
                    out.push(&item.value);
                }
            }
            Node::ArrayAccess { base, key } => {
                out.push(base);
                if let Some(k) = key {
                    out.push(k);
                }
            }
            Node::Assignment { target, value } => {
                out.push(target);
                out.push(value);
            }
            Node::Ternary {
                condition,
                then,
                otherwise,
            } => {
                out.push(condition);
                if let Some(t) = then {
                    out.push(t);
                }
                out.push(otherwise);
            }
            Node::Cast { inner, .. } => out.push(inner),
            Node::PropertyAccess { base, .. } => out.push(base),
            Node::Closure { body, .. }
            | Node::Function { body, .. }
            | Node::Method { body, .. } => out.extend(body.iter()),
            Node::Class { members, .. } => out.extend(members.iter()),
            Node::Property { default, .. } => {
                if let Some(d) = default {
                    out.push(d);
                }
            }
            Node::Return { value } => {
                if let Some(v) = value {
                    out.push(v);
                }
            }
            Node::Other { children, .. } => out.extend(children.iter()),
            Node::Variable { .. }
            | Node::StringLiteral { .. }
            | Node::IntLiteral { .. }
            | Node::ConstantRef { .. }
            | Node::Namespace { .. }
            | Node::Use { .. } => {}
        }
        out
    }

    /// Pre-order, left-to-right traversal including `self`.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Name of the called function or method, if this node is a call.
    pub fn call_name(&self) -> Option<&str> {
        match &self.node {
            Node::FunctionCall { name, .. }
            | Node::MethodCall { name, .. }
            | Node::StaticCall { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Arguments of a call node, empty for anything else.
    pub fn call_args(&self) -> &[SyntaxNode] {
        match &self.node {
            Node::FunctionCall { args, .. }
            | Node::MethodCall { args, .. }
            | Node::StaticCall { args, .. }
            | Node::New { args, .. } => args,
            _ => &[],
        }
    }

    /// Literal string value, when the node is a plain string literal.
    pub fn as_str(&self) -> Option<&str> {
        match &self.node {
            Node::StringLiteral { value } => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.node {
            Node::IntLiteral { value } => Some(*value),
            _ => None,
        }
    }

    /// Looks up `key` in an array literal with string keys.
    pub fn array_get(&self, key: &str) -> Option<&SyntaxNode> {
        match &self.node {
            Node::ArrayLiteral { items } => items
                .iter()
                .find(|i| i.key.as_ref().and_then(|k| k.as_str()) == Some(key))
                .map(|i| &i.value),
            _ => None,
        }
    }

    /// Whether the node is the constant `true` (case-insensitive).
    pub fn is_true(&self) -> bool {
        matches!(&self.node, Node::ConstantRef { name } if name.eq_ignore_ascii_case("true"))
    }

    pub fn is_false(&self) -> bool {
        matches!(&self.node, Node::ConstantRef { name } if name.eq_ignore_ascii_case("false"))
    }
}

/// Iterator returned by [`SyntaxNode::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

/// Parsed file: top-level statements in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAst {
    pub file_path: String,
    pub nodes: Vec<SyntaxNode>,
    /// The parser recovered from syntax errors somewhere in the file.
    #[serde(default)]
    pub has_errors: bool,
}

impl FileAst {
    pub fn new(file_path: String) -> Self {
        Self {
            file_path,
            nodes: Vec::new(),
            has_errors: false,
        }
    }

    pub fn push(&mut self, node: SyntaxNode) {
        self.nodes.push(node);
    }

    /// Pre-order traversal of every node in the file.
    pub fn walk(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.nodes.iter().flat_map(|n| n.walk())
    }

    /// Declared namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.walk().find_map(|n| match &n.node {
            Node::Namespace { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// `use` imports as `(alias, full path)` pairs. Imports without an
    /// explicit alias use the last path segment.
    pub fn imports(&self) -> Vec<(String, String)> {
        self.walk()
            .filter_map(|n| match &n.node {
                Node::Use { path, alias } => {
                    let short = alias.clone().unwrap_or_else(|| {
                        path.rsplit('\\').next().unwrap_or(path).to_string()
                    });
                    Some((short, path.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Exports the tree to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
