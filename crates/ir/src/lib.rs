//! Syntax tree model shared by the parser and the analyzers.
//!
//! The parser lowers concrete PHP syntax into [`SyntaxNode`] trees (see
//! [`ast`]); analyzers borrow them and run the queries in [`query`]. Nodes
//! are never mutated after construction.

pub mod ast;
pub mod builder;
pub mod query;

pub use ast::{ArrayItem, FileAst, Node, NodeKind, Span, SyntaxNode, Walk};
pub use query::{
    class_matches, find_calls, find_classes, find_function_calls, find_method_calls_by_name,
    find_nodes_of_kind, find_static_calls,
};

#[cfg(test)]
mod tests;
