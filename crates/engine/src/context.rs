use anyhow::{Context as _, Result};
use ir::FileAst;
use loader::{Excludes, ProjectFiles, RuleOptions, ScanConfig};
use parsers::{EnvFile, ParserMetrics};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

/// Everything a rule may look at during one scan. Shared read-only between
/// rules; the parse cache is the only interior state and always holds the
/// tree `parsers::parse_file` would return.
#[derive(Debug)]
pub struct ScanContext {
    root: PathBuf,
    files: ProjectFiles,
    excludes: Excludes,
    config: ScanConfig,
    asts: RwLock<HashMap<PathBuf, Arc<FileAst>>>,
    parser_metrics: Mutex<ParserMetrics>,
}

impl ScanContext {
    pub fn new(files: ProjectFiles, excludes: Excludes, config: ScanConfig) -> Self {
        ScanContext {
            root: files.root.clone(),
            files,
            excludes,
            config,
            asts: RwLock::new(HashMap::new()),
            parser_metrics: Mutex::new(ParserMetrics::default()),
        }
    }

    /// Discovers `root` with the exclusions configured in `config`.
    pub fn discover(root: &Path, config: ScanConfig) -> Result<Self> {
        let excludes = config.excludes(root)?;
        let files = ProjectFiles::discover(root, &excludes)
            .with_context(|| format!("Failed to discover files under {}", root.display()))?;
        Ok(Self::new(files, excludes, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &ProjectFiles {
        &self.files
    }

    pub fn excludes(&self) -> &Excludes {
        &self.excludes
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.is_excluded(self.relative(path))
    }

    /// Options configured for rule `id`.
    pub fn options(&self, id: &str) -> RuleOptions {
        self.config.options(id)
    }

    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Syntax tree of a PHP file, parsed at most once per scan. Files that
    /// cannot be read or parsed are logged and yield `None`.
    pub fn ast(&self, path: &Path) -> Option<Arc<FileAst>> {
        if let Some(ast) = self
            .asts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
        {
            return Some(Arc::clone(ast));
        }

        let mut metrics = ParserMetrics::default();
        let parsed = parsers::parse_file(path, Some(&mut metrics));
        {
            let mut total = self.parser_metrics.lock().unwrap_or_else(|e| e.into_inner());
            total.files_parsed += metrics.files_parsed;
            total.parse_errors += metrics.parse_errors;
        }
        match parsed {
            Ok(Some(ast)) => {
                debug!(path = %path.display(), has_errors = ast.has_errors, "Parsed file");
                let mut cache = self.asts.write().unwrap_or_else(|e| e.into_inner());
                let entry = cache
                    .entry(path.to_path_buf())
                    .or_insert_with(|| Arc::new(ast));
                Some(Arc::clone(entry))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unparsable file");
                None
            }
        }
    }

    /// Parsed `.env` file, `None` when it cannot be read.
    pub fn env(&self, path: &Path) -> Option<EnvFile> {
        match fs::read_to_string(path) {
            Ok(content) => Some(parsers::parse_env(&content, &path.to_string_lossy())),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable env file");
                None
            }
        }
    }

    /// Reads a file as text, logging and skipping failures.
    pub fn read(&self, path: &Path) -> Option<String> {
        match fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                None
            }
        }
    }

    pub fn parser_metrics(&self) -> ParserMetrics {
        self.parser_metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
