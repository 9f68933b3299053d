//! Syntax-tree matchers shared by the analyzers: unsafe string building,
//! user-input detection, fluent-chain resolution and facade names.

pub mod matchers;
pub mod names;
pub mod sources;

pub use matchers::{
    chain_calls, contains_concatenation, contains_interpolated_string,
    find_first_tainted_input_node, find_first_vulnerable_node, is_fluent_chain_rooted_at,
    Matcher, MAX_CHAIN_DEPTH,
};
pub use names::NameResolver;
pub use sources::InputSources;

#[cfg(test)]
mod tests;
