use loader::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Position of a finding in the scanned project.
pub struct Location {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single violation reported by a rule.
pub struct Finding {
    /// Stable fingerprint, filled in by the engine.
    #[serde(default)]
    pub id: String,
    /// Rule that produced the finding, filled in by the engine.
    #[serde(default)]
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub metadata: JsonMap<String, JsonValue>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<PathBuf>,
        line: usize,
        recommendation: impl Into<String>,
    ) -> Self {
        Finding {
            id: String::new(),
            rule_id: String::new(),
            severity,
            message: message.into(),
            location: Location {
                file: file.into(),
                line,
                column: None,
            },
            recommendation: recommendation.into(),
            code_snippet: None,
            metadata: JsonMap::new(),
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.location.column = Some(column);
        self
    }

    /// Attaches a code snippet; blank snippets are dropped.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        if !snippet.trim().is_empty() {
            self.code_snippet = Some(snippet);
        }
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn file(&self) -> &Path {
        &self.location.file
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    /// Fingerprint of this finding as reported by `rule_id`.
    pub fn fingerprint(&self, rule_id: &str) -> String {
        let file = self.location.file.to_string_lossy().replace('\\', "/");
        let column = self.location.column.unwrap_or(0);
        blake3::hash(
            format!(
                "{}:{}:{}:{}:{}",
                rule_id, file, self.location.line, column, self.message
            )
            .as_bytes(),
        )
        .to_hex()
        .to_string()
    }

    pub(crate) fn stamp(&mut self, rule_id: &str) {
        self.rule_id = rule_id.to_string();
        self.id = self.fingerprint(rule_id);
    }
}

/// Drops repeats of the same message at the same file, line and column,
/// keeping the first occurrence.
pub(crate) fn dedup_findings(findings: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    findings.retain(|f| seen.insert(f.fingerprint(&f.rule_id)));
}

/// Findings of a `Failed` or `Warning` outcome. Never empty: values are
/// only produced by [`crate::aggregate`] or by deserializing a non-empty
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Finding>", into = "Vec<Finding>")]
pub struct FindingSet(Vec<Finding>);

impl FindingSet {
    pub(crate) fn new(findings: Vec<Finding>) -> Option<Self> {
        (!findings.is_empty()).then_some(FindingSet(findings))
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Finding] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.0.iter()
    }

    pub fn max_severity(&self) -> Severity {
        self.0
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Info)
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.0
    }

    pub(crate) fn as_mut_vec(&mut self) -> &mut Vec<Finding> {
        &mut self.0
    }
}

impl TryFrom<Vec<Finding>> for FindingSet {
    type Error = String;

    fn try_from(findings: Vec<Finding>) -> Result<Self, Self::Error> {
        FindingSet::new(findings).ok_or_else(|| "finding list must not be empty".to_string())
    }
}

impl From<FindingSet> for Vec<Finding> {
    fn from(set: FindingSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a FindingSet {
    type Item = &'a Finding;
    type IntoIter = std::slice::Iter<'a, Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
