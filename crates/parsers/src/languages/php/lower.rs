//! Lowering of tree-sitter-php concrete syntax into [`ir::SyntaxNode`].

use ir::{ArrayItem, Node, Span, SyntaxNode};
use tree_sitter::Node as TsNode;

/// Nesting depth past which subtrees are replaced by a `truncated` node.
pub const MAX_LOWERING_DEPTH: usize = 256;

const SKIPPED: &[&str] = &["comment", "php_tag", "text", "text_interpolation"];

/// Nodes that carry an embedded expression inside a double-quoted string
/// or heredoc.
const INTERPOLATIONS: &[&str] = &[
    "variable_name",
    "dynamic_variable_name",
    "member_access_expression",
    "nullsafe_member_access_expression",
    "member_call_expression",
    "nullsafe_member_call_expression",
    "subscript_expression",
    "scoped_call_expression",
    "scoped_property_access_expression",
    "function_call_expression",
    "class_constant_access_expression",
];

const STRING_DELIMITERS: &[&str] = &["heredoc_start", "heredoc_end"];

fn span(node: TsNode) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(start.row + 1, start.column + 1, end.row + 1)
}

fn named<'t>(node: TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !SKIPPED.contains(&c.kind()))
        .collect()
}

fn named_of_kind<'t>(node: TsNode<'t>, kinds: &[&str]) -> Option<TsNode<'t>> {
    named(node).into_iter().find(|c| kinds.contains(&c.kind()))
}

fn unquote(raw: &str) -> &str {
    let raw = raw
        .strip_prefix(['b', 'B'])
        .filter(|r| r.starts_with(['\'', '"']))
        .unwrap_or(raw);
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(q @ ('\'' | '"')), Some(e)) if q == e && raw.len() >= 2 => &raw[1..raw.len() - 1],
        _ => raw,
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(|c| *c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

pub(crate) struct Lowerer<'s> {
    src: &'s str,
    depth: usize,
}

impl<'s> Lowerer<'s> {
    pub(crate) fn new(src: &'s str) -> Self {
        Self { src, depth: 0 }
    }

    fn text(&self, node: TsNode) -> String {
        node.utf8_text(self.src.as_bytes())
            .unwrap_or_default()
            .to_string()
    }

    fn field_text(&self, node: TsNode, field: &str) -> Option<String> {
        node.child_by_field_name(field).map(|n| self.text(n))
    }

    /// Lowers the statement-level children of `node`, dropping comments,
    /// open tags and inline HTML.
    pub(crate) fn statements(&mut self, node: TsNode) -> Vec<SyntaxNode> {
        named(node).into_iter().map(|c| self.lower(c)).collect()
    }

    fn lower(&mut self, node: TsNode) -> SyntaxNode {
        if self.depth >= MAX_LOWERING_DEPTH {
            return SyntaxNode::new(
                span(node),
                Node::Other {
                    kind: "truncated".into(),
                    children: Vec::new(),
                },
            );
        }
        self.depth += 1;
        let out = self.lower_inner(node);
        self.depth -= 1;
        out
    }

    fn boxed(&mut self, node: Option<TsNode>, parent: TsNode) -> Box<SyntaxNode> {
        Box::new(match node {
            Some(n) => self.lower(n),
            None => SyntaxNode::new(
                span(parent),
                Node::Other {
                    kind: "missing".into(),
                    children: Vec::new(),
                },
            ),
        })
    }

    fn other(&mut self, node: TsNode) -> Node {
        Node::Other {
            kind: node.kind().to_string(),
            children: self.statements(node),
        }
    }

    fn lower_inner(&mut self, node: TsNode) -> SyntaxNode {
        let sp = span(node);
        let kids = named(node);
        let payload = match node.kind() {
            "expression_statement" | "parenthesized_expression" => {
                return match kids.first() {
                    Some(inner) => self.lower(*inner),
                    None => SyntaxNode::new(sp, self.other(node)),
                };
            }
            "binary_expression" => {
                let left = node.child_by_field_name("left").or(kids.first().copied());
                let right = node.child_by_field_name("right").or(kids.last().copied());
                let op = node
                    .child_by_field_name("operator")
                    .or_else(|| node.child(1))
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let left = self.boxed(left, node);
                let right = self.boxed(right, node);
                if op.trim() == "." {
                    Node::Concat { left, right }
                } else {
                    Node::BinaryOp {
                        op: op.trim().to_string(),
                        left,
                        right,
                    }
                }
            }
            "assignment_expression"
            | "reference_assignment_expression"
            | "by_ref_assignment_expression" => {
                let left = node.child_by_field_name("left").or(kids.first().copied());
                let right = node.child_by_field_name("right").or(kids.last().copied());
                Node::Assignment {
                    target: self.boxed(left, node),
                    value: self.boxed(right, node),
                }
            }
            "augmented_assignment_expression" => {
                let left = node.child_by_field_name("left").or(kids.first().copied());
                let right = node.child_by_field_name("right").or(kids.last().copied());
                let op = node
                    .child_by_field_name("operator")
                    .or_else(|| node.child(1))
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let target = self.boxed(left, node);
                let rhs = self.boxed(right, node);
                // `$a .= $b` is kept as `$a = $a . $b` so concat checks see it
                let value = if op.trim() == ".=" {
                    Node::Concat {
                        left: target.clone(),
                        right: rhs,
                    }
                } else {
                    Node::BinaryOp {
                        op: op.trim().trim_end_matches('=').to_string(),
                        left: target.clone(),
                        right: rhs,
                    }
                };
                Node::Assignment {
                    target,
                    value: Box::new(SyntaxNode::new(sp, value)),
                }
            }
            "conditional_expression" => {
                let condition = node.child_by_field_name("condition").or(kids.first().copied());
                let alternative = node.child_by_field_name("alternative").or(kids.last().copied());
                let body = node
                    .child_by_field_name("body")
                    .or_else(|| (kids.len() >= 3).then(|| kids[1]));
                Node::Ternary {
                    condition: self.boxed(condition, node),
                    then: body.map(|b| Box::new(self.lower(b))),
                    otherwise: self.boxed(alternative, node),
                }
            }
            "cast_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .or(kids.first().copied())
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let value = node.child_by_field_name("value").or(kids.last().copied());
                Node::Cast {
                    ty: ty.trim().to_ascii_lowercase(),
                    inner: self.boxed(value, node),
                }
            }
            "function_call_expression" => {
                let name = node
                    .child_by_field_name("function")
                    .or(kids.first().copied())
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                Node::FunctionCall {
                    name: name.trim_start_matches('\\').to_string(),
                    args: self.arguments(node),
                }
            }
            "member_call_expression" | "nullsafe_member_call_expression" => {
                let object = node.child_by_field_name("object").or(kids.first().copied());
                let name = self
                    .field_text(node, "name")
                    .or_else(|| kids.get(1).map(|n| self.text(*n)))
                    .unwrap_or_default();
                Node::MethodCall {
                    receiver: self.boxed(object, node),
                    name,
                    args: self.arguments(node),
                }
            }
            "scoped_call_expression" => {
                let class = self
                    .field_text(node, "scope")
                    .or_else(|| kids.first().map(|n| self.text(*n)))
                    .unwrap_or_default();
                let name = self
                    .field_text(node, "name")
                    .or_else(|| kids.get(1).map(|n| self.text(*n)))
                    .unwrap_or_default();
                Node::StaticCall {
                    class: class.trim_start_matches('\\').to_string(),
                    name,
                    args: self.arguments(node),
                }
            }
            "member_access_expression" | "nullsafe_member_access_expression" => {
                let object = node.child_by_field_name("object").or(kids.first().copied());
                let name = self
                    .field_text(node, "name")
                    .or_else(|| kids.get(1).map(|n| self.text(*n)))
                    .unwrap_or_default();
                Node::PropertyAccess {
                    base: self.boxed(object, node),
                    name,
                }
            }
            "scoped_property_access_expression" => {
                let scope = node.child_by_field_name("scope").or(kids.first().copied());
                let name = self
                    .field_text(node, "name")
                    .or_else(|| kids.get(1).map(|n| self.text(*n)))
                    .unwrap_or_default();
                let base = match scope {
                    Some(s) => SyntaxNode::new(
                        span(s),
                        Node::ConstantRef {
                            name: self.text(s).trim_start_matches('\\').to_string(),
                        },
                    ),
                    None => SyntaxNode::new(sp, Node::ConstantRef { name: String::new() }),
                };
                Node::PropertyAccess {
                    base: Box::new(base),
                    name: name.trim_start_matches('$').to_string(),
                }
            }
            "class_constant_access_expression" => {
                let name: String = self.text(node).split_whitespace().collect();
                Node::ConstantRef {
                    name: name.trim_start_matches('\\').to_string(),
                }
            }
            "subscript_expression" => Node::ArrayAccess {
                base: self.boxed(kids.first().copied(), node),
                key: kids.get(1).map(|k| Box::new(self.lower(*k))),
            },
            "array_creation_expression" => {
                let mut items = Vec::new();
                for element in kids.iter().filter(|k| k.kind() == "array_element_initializer") {
                    let parts = named(*element);
                    match parts.as_slice() {
                        [] => {}
                        [value] => items.push(ArrayItem {
                            key: None,
                            value: self.lower(*value),
                        }),
                        [key, .., value] => {
                            let key = self.lower(*key);
                            let value = self.lower(*value);
                            items.push(ArrayItem {
                                key: Some(key),
                                value,
                            });
                        }
                    }
                }
                Node::ArrayLiteral { items }
            }
            "string" => {
                let raw = self.text(node);
                let inner = unquote(&raw);
                let value = if raw.trim_start_matches(['b', 'B']).starts_with('\'') {
                    inner.replace("\\'", "'").replace("\\\\", "\\")
                } else {
                    inner.to_string()
                };
                Node::StringLiteral { value }
            }
            "encapsed_string" | "heredoc" => {
                let mut parts = Vec::new();
                let mut interpolated = false;
                self.string_parts(node, &mut parts, &mut interpolated);
                if interpolated {
                    Node::InterpolatedString { parts }
                } else if node.kind() == "heredoc" {
                    Node::StringLiteral {
                        value: self.heredoc_body(node),
                    }
                } else {
                    Node::StringLiteral {
                        value: unquote(&self.text(node)).to_string(),
                    }
                }
            }
            "nowdoc" => Node::StringLiteral {
                value: self.heredoc_body(node),
            },
            "integer" => match parse_int(&self.text(node)) {
                Some(value) => Node::IntLiteral { value },
                None => self.other(node),
            },
            "boolean" | "null" | "name" | "qualified_name" | "relative_scope" => {
                Node::ConstantRef {
                    name: self.text(node).trim_start_matches('\\').to_string(),
                }
            }
            "variable_name" | "dynamic_variable_name" => Node::Variable {
                name: self.text(node).trim_start_matches('$').to_string(),
            },
            "object_creation_expression" => {
                let class = kids
                    .iter()
                    .find(|k| k.kind() != "arguments")
                    .map(|k| match k.kind() {
                        "name" | "qualified_name" | "variable_name" => {
                            self.text(*k).trim_start_matches('\\').to_string()
                        }
                        _ => "class@anonymous".to_string(),
                    })
                    .unwrap_or_default();
                Node::New {
                    class,
                    args: self.arguments(node),
                }
            }
            "anonymous_function_creation_expression" | "anonymous_function" => Node::Closure {
                params: self.params(node),
                body: match node.child_by_field_name("body") {
                    Some(body) => self.statements(body),
                    None => Vec::new(),
                },
            },
            "arrow_function" => Node::Closure {
                params: self.params(node),
                body: node
                    .child_by_field_name("body")
                    .map(|b| vec![self.lower(b)])
                    .unwrap_or_default(),
            },
            "function_definition" | "method_declaration" => {
                let name = self.field_text(node, "name").unwrap_or_default();
                let params = self.params(node);
                let body = match node.child_by_field_name("body") {
                    Some(body) => self.statements(body),
                    None => Vec::new(),
                };
                if node.kind() == "function_definition" {
                    Node::Function { name, params, body }
                } else {
                    Node::Method { name, params, body }
                }
            }
            "class_declaration" => {
                let name = self.field_text(node, "name").unwrap_or_default();
                let extends = named_of_kind(node, &["base_clause"])
                    .and_then(|b| named(b).into_iter().next())
                    .map(|n| self.text(n).trim_start_matches('\\').to_string());
                let implements = named_of_kind(node, &["class_interface_clause"])
                    .map(|c| {
                        named(c)
                            .into_iter()
                            .map(|n| self.text(n).trim_start_matches('\\').to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                let members = match node.child_by_field_name("body") {
                    Some(body) => self.statements(body),
                    None => Vec::new(),
                };
                Node::Class {
                    name,
                    extends,
                    implements,
                    members,
                }
            }
            "property_declaration" => {
                let mut props = self.properties(node);
                if props.len() == 1 {
                    return props.remove(0);
                }
                Node::Other {
                    kind: "property_declaration".into(),
                    children: props,
                }
            }
            "return_statement" => Node::Return {
                value: kids.first().map(|v| Box::new(self.lower(*v))),
            },
            "namespace_definition" => {
                let name = self
                    .field_text(node, "name")
                    .unwrap_or_default()
                    .trim_start_matches('\\')
                    .to_string();
                let decl = Node::Namespace { name };
                match node.child_by_field_name("body") {
                    Some(body) => {
                        let mut children = vec![SyntaxNode::new(sp, decl)];
                        children.extend(self.statements(body));
                        Node::Other {
                            kind: "namespace_definition".into(),
                            children,
                        }
                    }
                    None => decl,
                }
            }
            "namespace_use_declaration" => {
                let mut uses = self.uses(node);
                if uses.len() == 1 {
                    return uses.remove(0);
                }
                Node::Other {
                    kind: "namespace_use_declaration".into(),
                    children: uses,
                }
            }
            "echo_statement" | "print_intrinsic" => {
                let mut args = Vec::new();
                for kid in kids {
                    self.flatten_sequence(kid, &mut args);
                }
                Node::FunctionCall {
                    name: if node.kind() == "echo_statement" {
                        "echo".into()
                    } else {
                        "print".into()
                    },
                    args,
                }
            }
            "include_expression"
            | "include_once_expression"
            | "require_expression"
            | "require_once_expression" => Node::FunctionCall {
                name: node.kind().trim_end_matches("_expression").to_string(),
                args: kids.into_iter().map(|k| self.lower(k)).collect(),
            },
            _ => self.other(node),
        };
        SyntaxNode::new(sp, payload)
    }

    fn arguments(&mut self, call: TsNode) -> Vec<SyntaxNode> {
        let args = call
            .child_by_field_name("arguments")
            .or_else(|| named_of_kind(call, &["arguments"]));
        let Some(args) = args else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for arg in named(args) {
            match arg.kind() {
                "variadic_placeholder" => {}
                // named arguments put the label first; the value is last
                "argument" => {
                    if let Some(value) = named(arg).last() {
                        out.push(self.lower(*value));
                    }
                }
                _ => out.push(self.lower(arg)),
            }
        }
        out
    }

    fn params(&self, func: TsNode) -> Vec<String> {
        let Some(list) = func
            .child_by_field_name("parameters")
            .or_else(|| named_of_kind(func, &["formal_parameters"]))
        else {
            return Vec::new();
        };
        named(list)
            .into_iter()
            .filter_map(|p| {
                p.child_by_field_name("name")
                    .or_else(|| named_of_kind(p, &["variable_name"]))
                    .map(|n| self.text(n).trim_start_matches('$').to_string())
            })
            .collect()
    }

    fn properties(&mut self, decl: TsNode) -> Vec<SyntaxNode> {
        let kids = named(decl);
        let is_static = kids.iter().any(|k| k.kind() == "static_modifier");
        let mut out = Vec::new();
        for element in kids.iter().filter(|k| k.kind() == "property_element") {
            let name = element
                .child_by_field_name("name")
                .or_else(|| named_of_kind(*element, &["variable_name"]))
                .map(|n| self.text(n).trim_start_matches('$').to_string())
                .unwrap_or_default();
            let default = element.child_by_field_name("default_value").or_else(|| {
                named_of_kind(*element, &["property_initializer"])
                    .and_then(|init| named(init).into_iter().next())
            });
            let default = default.map(|d| Box::new(self.lower(d)));
            out.push(SyntaxNode::new(
                span(*element),
                Node::Property {
                    name,
                    is_static,
                    default,
                },
            ));
        }
        out
    }

    fn uses(&mut self, decl: TsNode) -> Vec<SyntaxNode> {
        let kids = named(decl);
        let prefix = kids
            .iter()
            .find(|k| k.kind() == "namespace_name")
            .map(|k| self.text(*k).trim_start_matches('\\').to_string());
        let mut clauses = Vec::new();
        for kid in &kids {
            match kid.kind() {
                "namespace_use_clause" | "namespace_use_group_clause" => clauses.push(*kid),
                "namespace_use_group" => clauses.extend(named(*kid).into_iter().filter(|c| {
                    matches!(c.kind(), "namespace_use_clause" | "namespace_use_group_clause")
                })),
                _ => {}
            }
        }
        clauses
            .into_iter()
            .filter_map(|clause| {
                let parts = named(clause);
                let path_node = parts.iter().find(|p| {
                    matches!(p.kind(), "name" | "qualified_name" | "namespace_name")
                })?;
                let mut path = self.text(*path_node).trim_start_matches('\\').to_string();
                if let Some(prefix) = &prefix {
                    path = format!("{prefix}\\{path}");
                }
                let alias = self
                    .field_text(clause, "alias")
                    .or_else(|| {
                        named_of_kind(clause, &["namespace_aliasing_clause"])
                            .and_then(|a| named(a).into_iter().next())
                            .map(|n| self.text(n))
                    })
                    .or_else(|| {
                        parts
                            .iter()
                            .skip_while(|p| p.id() != path_node.id())
                            .nth(1)
                            .filter(|p| p.kind() == "name")
                            .map(|n| self.text(*n))
                    });
                Some(SyntaxNode::new(span(clause), Node::Use { path, alias }))
            })
            .collect()
    }

    fn flatten_sequence(&mut self, node: TsNode, out: &mut Vec<SyntaxNode>) {
        if node.kind() == "sequence_expression" {
            for kid in named(node) {
                self.flatten_sequence(kid, out);
            }
        } else {
            out.push(self.lower(node));
        }
    }

    fn string_parts(&mut self, node: TsNode, parts: &mut Vec<SyntaxNode>, interpolated: &mut bool) {
        for kid in named(node) {
            let kind = kid.kind();
            if INTERPOLATIONS.contains(&kind) {
                *interpolated = true;
                parts.push(self.lower(kid));
            } else if STRING_DELIMITERS.contains(&kind) {
                continue;
            } else if kid.named_child_count() > 0 {
                self.string_parts(kid, parts, interpolated);
            } else {
                parts.push(SyntaxNode::new(
                    span(kid),
                    Node::StringLiteral {
                        value: self.text(kid),
                    },
                ));
            }
        }
    }

    fn heredoc_body(&self, node: TsNode) -> String {
        let text = self.text(node);
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() <= 2 {
            return String::new();
        }
        lines[1..lines.len() - 1].join("\n")
    }
}
