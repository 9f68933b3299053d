//! Parsers for the file types found in a Laravel project.
//!
//! - `php`: tree-sitter based, produces an [`ir::FileAst`]
//! - `env`: line based dotenv reader
//!
//! Blade templates, JSON and config files are read as text by the
//! analyzers and have no parser here.

pub mod env;
pub use env::{parse_env, EnvEntry, EnvFile};

pub mod php;
pub use php::{parse_php, MAX_LOWERING_DEPTH};
