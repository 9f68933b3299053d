//! Partitioning of a Laravel project into file roles.

use crate::excludes::Excludes;
use crate::walk::visit;
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Role of a file in a Laravel project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Route,
    Controller,
    Model,
    Middleware,
    Config,
    View,
    Env,
    Php,
    ComposerJson,
    ComposerLock,
}

/// Classifies a root-relative path. Files with no role return `None`.
///
/// # Example
/// ```
/// use loader::{classify, FileRole};
/// use std::path::Path;
/// assert_eq!(classify(Path::new("routes/api.php")), Some(FileRole::Route));
/// assert_eq!(classify(Path::new("app/User.php")), Some(FileRole::Model));
/// assert_eq!(classify(Path::new(".env.example")), None);
/// ```
pub fn classify(rel: &Path) -> Option<FileRole> {
    let rel = rel.to_string_lossy().replace('\\', "/");
    let name = rel.rsplit('/').next().unwrap_or(&rel);
    let top_level = !rel.contains('/');

    if top_level {
        match name {
            "composer.json" => return Some(FileRole::ComposerJson),
            "composer.lock" => return Some(FileRole::ComposerLock),
            ".env.example" => return None,
            n if n == ".env" || n.starts_with(".env.") => return Some(FileRole::Env),
            _ => {}
        }
    }
    if name.ends_with(".blade.php") {
        return rel
            .starts_with("resources/views/")
            .then_some(FileRole::View);
    }
    if !name.ends_with(".php") {
        return None;
    }
    let role = if rel.starts_with("routes/") {
        FileRole::Route
    } else if rel.starts_with("app/Http/Controllers/") {
        FileRole::Controller
    } else if rel.starts_with("app/Http/Middleware/") {
        FileRole::Middleware
    } else if rel.starts_with("app/Models/")
        || (rel.starts_with("app/") && rel.matches('/').count() == 1)
    {
        FileRole::Model
    } else if rel.starts_with("config/") {
        FileRole::Config
    } else {
        FileRole::Php
    };
    Some(role)
}

/// Files of one project grouped by role. Every list is sorted and holds
/// paths joined onto `root`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectFiles {
    pub root: PathBuf,
    pub routes: Vec<PathBuf>,
    pub controllers: Vec<PathBuf>,
    pub models: Vec<PathBuf>,
    pub middleware: Vec<PathBuf>,
    pub config: Vec<PathBuf>,
    pub views: Vec<PathBuf>,
    pub env: Vec<PathBuf>,
    /// PHP files with no more specific role.
    pub php: Vec<PathBuf>,
    pub composer_json: Option<PathBuf>,
    pub composer_lock: Option<PathBuf>,
}

impl ProjectFiles {
    /// Walks `root` and classifies every file that survives `excludes`.
    pub fn discover(root: &Path, excludes: &Excludes) -> Result<Self> {
        if !root.is_dir() {
            bail!("project root {} is not a directory", root.display());
        }
        let mut files = ProjectFiles {
            root: root.to_path_buf(),
            ..Default::default()
        };
        visit(root, excludes, &mut |path| {
            let rel = path.strip_prefix(root).unwrap_or(path);
            if let Some(role) = classify(rel) {
                files.insert(role, path.to_path_buf());
            }
            Ok(())
        })?;
        files.sort();
        debug!(
            root = %root.display(),
            routes = files.routes.len(),
            controllers = files.controllers.len(),
            models = files.models.len(),
            middleware = files.middleware.len(),
            config = files.config.len(),
            views = files.views.len(),
            env = files.env.len(),
            php = files.php.len(),
            "Project files discovered"
        );
        Ok(files)
    }

    fn insert(&mut self, role: FileRole, path: PathBuf) {
        match role {
            FileRole::Route => self.routes.push(path),
            FileRole::Controller => self.controllers.push(path),
            FileRole::Model => self.models.push(path),
            FileRole::Middleware => self.middleware.push(path),
            FileRole::Config => self.config.push(path),
            FileRole::View => self.views.push(path),
            FileRole::Env => self.env.push(path),
            FileRole::Php => self.php.push(path),
            FileRole::ComposerJson => self.composer_json = Some(path),
            FileRole::ComposerLock => self.composer_lock = Some(path),
        }
    }

    fn sort(&mut self) {
        for list in [
            &mut self.routes,
            &mut self.controllers,
            &mut self.models,
            &mut self.middleware,
            &mut self.config,
            &mut self.views,
            &mut self.env,
            &mut self.php,
        ] {
            list.sort();
        }
    }

    /// Every plain PHP file (Blade templates excluded), sorted.
    pub fn php_files(&self) -> Vec<&Path> {
        let mut all: Vec<&Path> = self
            .routes
            .iter()
            .chain(&self.controllers)
            .chain(&self.models)
            .chain(&self.middleware)
            .chain(&self.config)
            .chain(&self.php)
            .map(PathBuf::as_path)
            .collect();
        all.sort();
        all
    }

    /// PHP files under `app/`, sorted.
    pub fn app_files(&self) -> Vec<&Path> {
        let app = self.root.join("app");
        self.php_files()
            .into_iter()
            .filter(|p| p.starts_with(&app))
            .collect()
    }

    pub fn has_php(&self) -> bool {
        !self.php_files().is_empty()
    }

    /// `config/<name>.php`, if discovered.
    pub fn config_file(&self, name: &str) -> Option<&Path> {
        let wanted = self.root.join("config").join(format!("{name}.php"));
        self.config
            .iter()
            .find(|p| **p == wanted)
            .map(PathBuf::as_path)
    }

    /// Path relative to the project root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
