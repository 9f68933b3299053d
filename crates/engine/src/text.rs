//! Line oriented helpers for analyzers that work on raw source text.

use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads `path` as lines (0-indexed). An unreadable file yields no lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => content.lines().map(str::to_string).collect(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to read lines");
            Vec::new()
        }
    }
}

/// Index of the line that closes the region opened at `start`.
///
/// A counter is incremented for every `open` and decremented for every
/// `close` over at most `max_scan` lines. The first line where the counter
/// drops back to zero after an `open` was seen wins. Otherwise the last
/// line of the window containing `close` is returned, and failing that the
/// last line of the input. Unrelated braces inside string literals make the
/// counter drift; the fallbacks bound the damage. Empty input yields 0.
///
/// # Example
/// ```
/// use engine::text::balanced_region_end;
/// let lines = ["if ($a) {", "  foo();", "}", "bar();"];
/// assert_eq!(balanced_region_end(&lines, 0, '{', '}', 50), 2);
/// ```
pub fn balanced_region_end<S: AsRef<str>>(
    lines: &[S],
    start: usize,
    open: char,
    close: char,
    max_scan: usize,
) -> usize {
    region_end(
        lines,
        start,
        max_scan,
        |line| {
            let opens = line.matches(open).count() as i64;
            let closes = line.matches(close).count() as i64;
            (opens, closes)
        },
        |line| line.contains(close),
    )
}

/// [`balanced_region_end`] with multi-character delimiters such as
/// `<form` and `</form>`. Matching is ASCII case-insensitive.
pub fn balanced_region_end_str<S: AsRef<str>>(
    lines: &[S],
    start: usize,
    open: &str,
    close: &str,
    max_scan: usize,
) -> usize {
    let open = open.to_ascii_lowercase();
    let close = close.to_ascii_lowercase();
    region_end(
        lines,
        start,
        max_scan,
        |line| {
            let lower = line.to_ascii_lowercase();
            let opens = lower.matches(open.as_str()).count() as i64;
            let closes = lower.matches(close.as_str()).count() as i64;
            (opens, closes)
        },
        |line| line.to_ascii_lowercase().contains(close.as_str()),
    )
}

fn region_end<S, C, H>(lines: &[S], start: usize, max_scan: usize, count: C, has_close: H) -> usize
where
    S: AsRef<str>,
    C: Fn(&str) -> (i64, i64),
    H: Fn(&str) -> bool,
{
    if lines.is_empty() {
        return 0;
    }
    let last = lines.len() - 1;
    if start > last {
        return last;
    }
    let end = start.saturating_add(max_scan).min(lines.len());

    let mut depth: i64 = 0;
    let mut opened = false;
    for (idx, line) in lines[start..end].iter().enumerate() {
        let (opens, closes) = count(line.as_ref());
        if opens > 0 {
            opened = true;
        }
        depth += opens - closes;
        if opened && depth <= 0 {
            return start + idx;
        }
    }

    (start..end)
        .rev()
        .find(|&idx| has_close(lines[idx].as_ref()))
        .unwrap_or(last)
}

/// Line `line` (1-based) with `context` lines on each side, joined by `\n`.
/// Out of range lines yield an empty string.
pub fn snippet_from_lines<S: AsRef<str>>(lines: &[S], line: usize, context: usize) -> String {
    if line == 0 || line > lines.len() {
        return String::new();
    }
    let idx = line - 1;
    let from = idx.saturating_sub(context);
    let to = (idx + context).min(lines.len() - 1);
    lines[from..=to]
        .iter()
        .map(|l| l.as_ref().trim_end_matches(['\r', '\n']))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads `path` and extracts the snippet around `line` (1-based).
pub fn code_snippet(path: &Path, line: usize, context: usize) -> String {
    snippet_from_lines(&read_lines(path), line, context)
}

/// 1-based line number of byte offset `offset` in `text`. Offsets past the
/// end map to the last line.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// 1-based byte column of `offset` within its line.
pub fn column_of_offset(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    let line_start = text.as_bytes()[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    offset - line_start + 1
}
