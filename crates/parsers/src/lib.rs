//! Converters of Laravel project files into the syntax trees and records
//! used by the analyzers.

use anyhow::{Context, Result};
use ir::FileAst;
use serde::Serialize;
use std::{fs, path::Path};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParserMetrics {
    pub files_parsed: usize,
    pub parse_errors: usize,
}

pub mod languages;
pub use languages::*;

/// Determines the file type from the name/extension.
///
/// # Example
/// ```
/// use parsers::detect_type;
/// use std::path::Path;
/// assert_eq!(detect_type(Path::new("resources/views/home.blade.php")), Some("blade"));
/// assert_eq!(detect_type(Path::new(".env.production")), Some("env"));
/// assert_eq!(detect_type(Path::new("README.md")), None);
/// ```
pub fn detect_type(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    let ext = path.extension().map(|e| e.to_string_lossy().to_lowercase());
    let detected = if name.ends_with(".blade.php") {
        Some("blade")
    } else if name == ".env" || name.starts_with(".env.") {
        Some("env")
    } else {
        match ext.as_deref() {
            Some("php") => Some("php"),
            Some("json") | Some("lock") => Some("json"),
            _ => None,
        }
    };
    match detected {
        Some(t) => debug!(file = %path.display(), file_type = t, "File type detected"),
        None => debug!(file = %path.display(), "Unsupported file type"),
    }
    detected
}

/// Reads a PHP file and lowers it into a [`FileAst`].
///
/// Returns `Ok(None)` for files that are not plain PHP (Blade templates
/// included). Files with recoverable syntax errors still produce a tree and
/// are counted in `metrics.parse_errors`.
///
/// # Example
/// ```
/// use parsers::parse_file;
/// use std::fs;
/// let path = std::env::temp_dir().join("webguard_doc_example.php");
/// fs::write(&path, "<?php\n$x = 1;\n").unwrap();
/// let ast = parse_file(&path, None).unwrap().unwrap();
/// assert_eq!(ast.nodes.len(), 1);
/// ```
pub fn parse_file(path: &Path, metrics: Option<&mut ParserMetrics>) -> Result<Option<FileAst>> {
    if detect_type(path) != Some("php") {
        return Ok(None);
    }
    debug!(file = %path.display(), "Parsing file");
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let res = parse_php(&content, &path.to_string_lossy());
    match (res, metrics) {
        (Err(e), Some(m)) => {
            m.parse_errors += 1;
            Err(e)
        }
        (Err(e), None) => Err(e),
        (Ok(ast), Some(m)) => {
            m.files_parsed += 1;
            if ast.has_errors {
                m.parse_errors += 1;
            }
            Ok(Some(ast))
        }
        (Ok(ast), None) => Ok(Some(ast)),
    }
}
