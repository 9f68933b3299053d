use ir::{class_matches, Node, SyntaxNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Registry of the syntactic shapes that read user-controlled input.
///
/// Method names are compared case-insensitively, as PHP does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSources {
    /// Superglobal arrays (`_GET`, `_POST`, ...), without the `$`.
    pub superglobals: BTreeSet<String>,
    /// Helper functions returning the current request (`request()`).
    pub request_functions: BTreeSet<String>,
    /// Variables conventionally holding the request (`$request`).
    pub request_variables: BTreeSet<String>,
    /// Facades proxying the request (`Request::all()`).
    pub request_facades: BTreeSet<String>,
    /// Accessors returning raw input when called without arguments.
    pub input_methods: BTreeSet<String>,
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for InputSources {
    fn default() -> Self {
        Self {
            superglobals: set(&["_GET", "_POST", "_REQUEST", "_COOKIE", "_FILES", "_SERVER"]),
            request_functions: set(&["request"]),
            request_variables: set(&["request"]),
            request_facades: set(&["Request", "Input"]),
            input_methods: set(&[
                "all",
                "input",
                "query",
                "post",
                "json",
                "cookie",
                "header",
                "getcontent",
                "toarray",
                "allfiles",
            ]),
        }
    }
}

static DEFAULT_SOURCES: OnceLock<InputSources> = OnceLock::new();

impl InputSources {
    /// Process-wide default registry.
    pub fn shared() -> &'static InputSources {
        DEFAULT_SOURCES.get_or_init(InputSources::default)
    }

    pub fn with_input_method(mut self, name: &str) -> Self {
        self.input_methods.insert(name.to_ascii_lowercase());
        self
    }

    pub fn with_superglobal(mut self, name: &str) -> Self {
        self.superglobals
            .insert(name.trim_start_matches('$').to_string());
        self
    }

    pub fn with_request_facade(mut self, name: &str) -> Self {
        self.request_facades.insert(name.to_string());
        self
    }

    pub fn is_superglobal(&self, name: &str) -> bool {
        self.superglobals.contains(name.trim_start_matches('$'))
    }

    pub fn is_input_method(&self, name: &str) -> bool {
        self.input_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(name))
    }

    pub fn is_request_facade(&self, class: &str) -> bool {
        self.request_facades
            .iter()
            .any(|f| class_matches(class, f))
    }

    /// Whether `node` evaluates to the current request object.
    pub fn is_request_holder(&self, node: &SyntaxNode) -> bool {
        match &node.node {
            Node::FunctionCall { name, args } => {
                args.is_empty() && self.request_functions.contains(name.as_str())
            }
            Node::Variable { name } => self.request_variables.contains(name.as_str()),
            // `$this->request` inside controllers and form requests
            Node::PropertyAccess { base, name } => {
                matches!(&base.node, Node::Variable { name: b } if b == "this")
                    && self.request_variables.contains(name.as_str())
            }
            _ => false,
        }
    }

    /// Whether `node` itself (not its descendants) reads raw input.
    ///
    /// Accessors only count without arguments: `$request->input('email')`
    /// is scoped to one field and is not reported.
    pub fn is_tainted(&self, node: &SyntaxNode) -> bool {
        match &node.node {
            Node::MethodCall {
                receiver,
                name,
                args,
            } => args.is_empty() && self.is_input_method(name) && self.is_request_holder(receiver),
            Node::StaticCall { class, name, args } => {
                args.is_empty() && self.is_input_method(name) && self.is_request_facade(class)
            }
            Node::ArrayAccess { base, .. } => {
                matches!(&base.node, Node::Variable { name } if self.is_superglobal(name))
            }
            Node::Variable { name } => self.is_superglobal(name),
            _ => false,
        }
    }
}
