//! Glob based path exclusion.
//!
//! Patterns are matched against paths relative to the project root, with
//! `/` separators on every platform.

use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Default maximum file size: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Name of the project-level ignore file.
pub const IGNORE_FILE: &str = ".webguardignore";

/// Directories never worth scanning in a Laravel checkout.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "vendor/",
    "node_modules/",
    "**/node_modules/",
    "storage/",
    "bootstrap/cache/",
    ".git/",
];

/// Converts a basic glob pattern to a regular expression.
///
/// `**` crosses directory separators, `*` does not. Character classes are
/// rejected.
///
/// # Example
///
/// ```
/// use loader::glob_to_regex;
/// let re = glob_to_regex("app/**/*.php").unwrap();
/// assert!(re.is_match("app/Http/Kernel.php"));
/// assert!(!re.is_match("routes/web.php"));
/// ```
pub fn glob_to_regex(pat: &str) -> Result<Regex, regex::Error> {
    if pat.contains('[') || pat.contains(']') {
        // character classes are not supported; surface a regex error
        return Regex::new("[");
    }
    let mut regex = String::from("^");
    let mut chars = pat.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` also matches zero directories
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        regex.push_str("(?:.*/)?");
                    } else {
                        regex.push_str(".*");
                    }
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '{' | '}' | '\\' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex.push('$');
    Regex::new(&regex)
}

/// Transforms a glob-style exclusion string into a [`Regex`].
/// A trailing slash excludes everything below the directory.
///
/// # Example
///
/// ```
/// use loader::parse_exclude;
/// let re = parse_exclude("storage/").unwrap();
/// assert!(re.is_match("storage/logs/laravel.log"));
/// ```
pub fn parse_exclude(s: &str) -> Result<Regex, String> {
    let s = s.trim().trim_start_matches("./");
    let glob_str = if s.ends_with('/') {
        format!("{s}**")
    } else {
        s.to_string()
    };
    glob_to_regex(&glob_str).map_err(|e| format!("invalid exclude '{s}': {e}"))
}

/// Set of exclusion patterns plus negated (`!pattern`) re-inclusions.
#[derive(Debug, Clone, Default)]
pub struct Excludes {
    patterns: Vec<Regex>,
    negated: Vec<Regex>,
    max_file_size: u64,
}

impl Excludes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes with [`DEFAULT_EXCLUDES`] and [`DEFAULT_MAX_FILE_SIZE`].
    pub fn with_defaults() -> Self {
        let mut ex = Self::new().with_max_file_size(DEFAULT_MAX_FILE_SIZE);
        for pat in DEFAULT_EXCLUDES {
            if let Ok(re) = parse_exclude(pat) {
                ex.patterns.push(re);
            }
        }
        ex
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Adds one pattern. A leading `!` re-includes matching paths.
    pub fn add(&mut self, pattern: &str) -> Result<(), String> {
        match pattern.strip_prefix('!') {
            Some(neg) => self.negated.push(parse_exclude(neg.trim_start_matches('/'))?),
            None => self.patterns.push(parse_exclude(pattern)?),
        }
        Ok(())
    }

    /// Reads [`IGNORE_FILE`] from `root`. Unanchored entries match at any
    /// depth, entries starting with `/` only at the root. Invalid lines are
    /// skipped.
    pub fn load_ignore_file(&mut self, root: &Path) {
        let Ok(content) = fs::read_to_string(root.join(IGNORE_FILE)) else {
            return;
        };
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (neg, body) = match line.strip_prefix('!') {
                Some(rest) => ("!", rest),
                None => ("", line),
            };
            let mut candidates = Vec::new();
            if let Some(anchored) = body.strip_prefix('/') {
                candidates.push(format!("{neg}{anchored}"));
            } else {
                candidates.push(format!("{neg}{body}"));
                if !body.starts_with("**/") {
                    candidates.push(format!("{neg}**/{body}"));
                }
            }
            for c in candidates {
                if let Err(e) = self.add(&c) {
                    debug!(pattern = line, error = %e, "Ignoring invalid ignore entry");
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len() + self.negated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `rel` (relative to the project root) is excluded. Directories
    /// are also tested with a trailing slash so `vendor/` prunes `vendor`.
    ///
    /// # Example
    ///
    /// ```
    /// use loader::Excludes;
    /// use std::path::Path;
    /// let ex = Excludes::with_defaults();
    /// assert!(ex.is_excluded(Path::new("vendor/laravel/framework/src/x.php")));
    /// assert!(!ex.is_excluded(Path::new("app/Models/User.php")));
    /// ```
    pub fn is_excluded(&self, rel: &Path) -> bool {
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        let as_dir = format!("{rel_str}/");
        let hit = |res: &[Regex]| {
            res.iter()
                .any(|re| re.is_match(&rel_str) || re.is_match(&as_dir))
        };
        hit(&self.patterns) && !hit(&self.negated)
    }

    /// Whether `path` is a regular file larger than the configured limit.
    pub fn is_oversized(&self, path: &Path) -> bool {
        if self.max_file_size == 0 {
            return false;
        }
        fs::metadata(path)
            .map(|m| m.is_file() && m.len() > self.max_file_size)
            .unwrap_or(false)
    }
}
