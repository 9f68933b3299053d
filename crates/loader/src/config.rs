//! Project configuration: `webguard.toml`, `.webguard.yml`/`.yaml` or
//! `webguard.json` at the project root.

use crate::excludes::{Excludes, DEFAULT_MAX_FILE_SIZE};
use crate::Severity;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file names looked up at the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "webguard.toml",
    ".webguard.yml",
    ".webguard.yaml",
    "webguard.json",
];

/// Free-form tunables of one rule, with typed getters that fall back to
/// a default when a key is missing or has the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleOptions(pub JsonMap<String, JsonValue>);

impl RuleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(JsonValue::as_u64).unwrap_or(default)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(JsonValue::as_bool).unwrap_or(default)
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(JsonValue::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// A list of strings. Non-string items are ignored; a missing key or a
    /// non-array value yields `default`.
    pub fn str_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.get(key).and_then(JsonValue::as_array) {
            Some(items) => items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect(),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extra exclusion globs, relative to the project root.
    pub exclude: Vec<String>,
    /// Disables the built-in exclusions (`vendor/`, `storage/`, ...).
    pub no_default_excludes: bool,
    pub disabled_rules: Vec<String>,
    /// When non-empty, only these rules run.
    pub enabled_rules: Vec<String>,
    pub rule_timeout_ms: Option<u64>,
    pub fail_on: Option<String>,
    pub max_file_size: Option<u64>,
    pub threads: Option<usize>,
    pub rules: BTreeMap<String, RuleOptions>,
}

impl ScanConfig {
    /// Options of rule `id`, empty when the file says nothing about it.
    pub fn options(&self, id: &str) -> RuleOptions {
        self.rules.get(id).cloned().unwrap_or_default()
    }

    pub fn is_rule_enabled(&self, id: &str) -> bool {
        if self.disabled_rules.iter().any(|r| r == id) {
            return false;
        }
        self.enabled_rules.is_empty() || self.enabled_rules.iter().any(|r| r == id)
    }

    pub fn fail_on_severity(&self) -> Result<Option<Severity>> {
        self.fail_on
            .as_deref()
            .map(|s| s.parse::<Severity>().map_err(|e| anyhow!(e)))
            .transpose()
    }

    /// Builds the exclusion set: defaults (unless disabled), configured
    /// globs, then the project's ignore file.
    pub fn excludes(&self, root: &Path) -> Result<Excludes> {
        let max = self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE);
        let mut ex = if self.no_default_excludes {
            Excludes::new().with_max_file_size(max)
        } else {
            Excludes::with_defaults().with_max_file_size(max)
        };
        for pat in &self.exclude {
            ex.add(pat).map_err(|e| anyhow!(e))?;
        }
        ex.load_ignore_file(root);
        Ok(ex)
    }
}

/// Loads a configuration file, choosing the format from its extension.
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg: ScanConfig = match ext.as_str() {
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?,
        "yml" | "yaml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?,
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?,
        other => bail!("unsupported config format '{other}' for {}", path.display()),
    };
    debug!(
        path = %path.display(),
        rules = cfg.rules.len(),
        excludes = cfg.exclude.len(),
        "Config loaded"
    );
    Ok(cfg)
}

/// First of [`CONFIG_FILE_NAMES`] present in `root`.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.is_file())
}
