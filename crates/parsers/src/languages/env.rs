use serde::Serialize;
use tracing::debug;

/// One `KEY=value` assignment of a dotenv file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
    /// 1-based line of the assignment.
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvFile {
    pub path: String,
    pub entries: Vec<EnvEntry>,
}

impl EnvFile {
    /// Last assignment of `key`, matching how dotenv loaders resolve
    /// duplicates.
    pub fn get(&self, key: &str) -> Option<&EnvEntry> {
        self.entries.iter().rev().find(|e| e.key == key)
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn parse_value(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                },
                '"' => return out,
                _ => out.push(c),
            }
        }
        return out;
    }
    if let Some(rest) = raw.strip_prefix('\'') {
        return rest.split('\'').next().unwrap_or_default().to_string();
    }
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}

/// Parses dotenv content. Blank lines, comments and lines without a valid
/// `KEY=` prefix are skipped.
pub fn parse_env(content: &str, path: &str) -> EnvFile {
    let mut file = EnvFile {
        path: path.to_string(),
        entries: Vec::new(),
    };
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !valid_key(key) {
            continue;
        }
        file.entries.push(EnvEntry {
            key: key.to_string(),
            value: parse_value(value),
            line: idx + 1,
        });
    }
    debug!(file = path, entries = file.entries.len(), "Parsed env file");
    file
}
