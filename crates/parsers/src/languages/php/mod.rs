use anyhow::{anyhow, Context, Result};
use ir::FileAst;
use std::sync::Mutex;
use tracing::debug;

mod lower;

#[cfg(test)]
mod tests;

pub use lower::MAX_LOWERING_DEPTH;

// tree-sitter parsers are not Sync; keep a small pool instead of one per call
static PARSER_POOL: Mutex<Vec<tree_sitter::Parser>> = Mutex::new(Vec::new());

const POOL_LIMIT: usize = 10;

fn get_parser() -> tree_sitter::Parser {
    let mut pool = PARSER_POOL.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(mut parser) = pool.pop() {
        parser.reset();
        parser
    } else {
        tree_sitter::Parser::new()
    }
}

fn return_parser(mut parser: tree_sitter::Parser) {
    let mut pool = PARSER_POOL.lock().unwrap_or_else(|e| e.into_inner());
    if pool.len() < POOL_LIMIT {
        parser.reset();
        pool.push(parser);
    }
}

/// Parses PHP source into a [`FileAst`].
///
/// Syntax errors do not fail the parse: tree-sitter recovers and the
/// returned tree has `has_errors` set. An `Err` means the grammar could not
/// be loaded or the parser gave up entirely.
pub fn parse_php(content: &str, file_path: &str) -> Result<FileAst> {
    let mut parser = get_parser();
    if let Err(e) = parser.set_language(tree_sitter_php::language()) {
        return_parser(parser);
        return Err(e).context("load php grammar");
    }
    let tree = parser.parse(content, None);
    return_parser(parser);
    let tree = tree.ok_or_else(|| anyhow!("failed to parse php source: {file_path}"))?;

    let root = tree.root_node();
    let mut file = FileAst::new(file_path.to_string());
    file.has_errors = root.has_error();
    if file.has_errors {
        debug!(file = file_path, "PHP source contains syntax errors");
    }
    file.nodes = lower::Lowerer::new(content).statements(root);
    debug!(file = file_path, nodes = file.nodes.len(), "PHP file lowered");
    Ok(file)
}
