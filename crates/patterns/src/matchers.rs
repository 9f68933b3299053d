//! Predicates and extractors over a [`SyntaxNode`] subtree.
//!
//! A [`Matcher`] memoizes subtree results by node address so analyzers can
//! ask the same question about nested nodes without re-walking them. The
//! free functions build a throwaway matcher per call.

use crate::sources::InputSources;
use ir::{Node, SyntaxNode};
use std::collections::HashMap;

/// Longest receiver chain followed by [`is_fluent_chain_rooted_at`].
pub const MAX_CHAIN_DEPTH: usize = 256;

fn key(node: &SyntaxNode) -> usize {
    node as *const SyntaxNode as usize
}

/// Memoizing matcher bound to one borrowed tree.
///
/// Nodes are borrowed for `'t`, so cached addresses stay valid and unique
/// for the matcher's lifetime.
pub struct Matcher<'t> {
    sources: &'t InputSources,
    concat: HashMap<usize, bool>,
    interpolated: HashMap<usize, bool>,
    tainted: HashMap<usize, bool>,
}

impl<'t> Matcher<'t> {
    pub fn new(sources: &'t InputSources) -> Self {
        Self {
            sources,
            concat: HashMap::new(),
            interpolated: HashMap::new(),
            tainted: HashMap::new(),
        }
    }

    pub fn sources(&self) -> &InputSources {
        self.sources
    }

    pub fn contains_concatenation(&mut self, node: &'t SyntaxNode) -> bool {
        if let Some(hit) = self.concat.get(&key(node)) {
            return *hit;
        }
        let hit = matches!(node.node, Node::Concat { .. })
            || node
                .children()
                .into_iter()
                .any(|c| self.contains_concatenation(c));
        self.concat.insert(key(node), hit);
        hit
    }

    pub fn contains_interpolated_string(&mut self, node: &'t SyntaxNode) -> bool {
        if let Some(hit) = self.interpolated.get(&key(node)) {
            return *hit;
        }
        let hit = matches!(node.node, Node::InterpolatedString { .. })
            || node
                .children()
                .into_iter()
                .any(|c| self.contains_interpolated_string(c));
        self.interpolated.insert(key(node), hit);
        hit
    }

    /// Concatenation or interpolation anywhere in the subtree.
    pub fn is_dynamic_string(&mut self, node: &'t SyntaxNode) -> bool {
        self.contains_concatenation(node) || self.contains_interpolated_string(node)
    }

    /// First concatenation or interpolation node in pre-order.
    pub fn find_first_vulnerable_node(&mut self, node: &'t SyntaxNode) -> Option<&'t SyntaxNode> {
        if matches!(
            node.node,
            Node::Concat { .. } | Node::InterpolatedString { .. }
        ) {
            return Some(node);
        }
        for child in node.children() {
            if self.is_dynamic_string(child) {
                return self.find_first_vulnerable_node(child);
            }
        }
        None
    }

    pub fn contains_tainted_input(&mut self, node: &'t SyntaxNode) -> bool {
        if let Some(hit) = self.tainted.get(&key(node)) {
            return *hit;
        }
        let hit = self.sources.is_tainted(node)
            || node
                .children()
                .into_iter()
                .any(|c| self.contains_tainted_input(c));
        self.tainted.insert(key(node), hit);
        hit
    }

    /// First node reading raw user input, in pre-order.
    pub fn find_first_tainted_input_node(
        &mut self,
        node: &'t SyntaxNode,
    ) -> Option<&'t SyntaxNode> {
        if self.sources.is_tainted(node) {
            return Some(node);
        }
        for child in node.children() {
            if self.contains_tainted_input(child) {
                return self.find_first_tainted_input_node(child);
            }
        }
        None
    }
}

pub fn contains_concatenation(node: &SyntaxNode) -> bool {
    Matcher::new(InputSources::shared()).contains_concatenation(node)
}

pub fn contains_interpolated_string(node: &SyntaxNode) -> bool {
    Matcher::new(InputSources::shared()).contains_interpolated_string(node)
}

pub fn find_first_vulnerable_node(node: &SyntaxNode) -> Option<&SyntaxNode> {
    Matcher::new(InputSources::shared()).find_first_vulnerable_node(node)
}

pub fn find_first_tainted_input_node<'t>(
    node: &'t SyntaxNode,
    sources: &'t InputSources,
) -> Option<&'t SyntaxNode> {
    Matcher::new(sources).find_first_tainted_input_node(node)
}

/// Method calls of a fluent chain, outermost first, stopping at the first
/// receiver that is not a method call. Chains longer than
/// [`MAX_CHAIN_DEPTH`] are cut.
pub fn chain_calls(node: &SyntaxNode) -> Vec<&SyntaxNode> {
    let mut out = Vec::new();
    let mut current = node;
    while let Node::MethodCall { receiver, .. } = &current.node {
        if out.len() == MAX_CHAIN_DEPTH {
            break;
        }
        out.push(current);
        current = receiver;
    }
    out
}

/// Follows the receivers of method calls accepted by `is_chain_method` and
/// evaluates `root` on the first node that is not such a call.
///
/// `DB::table('users')->where(..)->update(..)` is rooted at the
/// `DB::table` call when `where` and `update` are chain methods. Chains
/// deeper than [`MAX_CHAIN_DEPTH`] are reported as not matching.
pub fn is_fluent_chain_rooted_at<C, R>(node: &SyntaxNode, is_chain_method: C, root: R) -> bool
where
    C: Fn(&str) -> bool,
    R: Fn(&SyntaxNode) -> bool,
{
    let mut current = node;
    for _ in 0..=MAX_CHAIN_DEPTH {
        match &current.node {
            Node::MethodCall { receiver, name, .. } if is_chain_method(name) => {
                current = receiver;
            }
            _ => return root(current),
        }
    }
    false
}
